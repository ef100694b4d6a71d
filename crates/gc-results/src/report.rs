//! Line-oriented report files.

use std::fmt::Write as _;

use crate::types::{DivergenceRow, IterationRow};
use crate::{ResultsError, ResultsResult};

pub const ITERATION_HEADER: &str = "date\tstep\titerations";
pub const DIVERGENCE_HEADER: &str = "date\tstep\titerations_at_abort";
const SUMMARY_PREFIX: &str = "# divergent steps: ";

pub fn render_iterations(rows: &[IterationRow]) -> String {
    let mut out = String::from(ITERATION_HEADER);
    out.push('\n');
    for r in rows {
        let _ = writeln!(out, "{}\t{}\t{}", r.date, r.step, r.iterations);
    }
    out
}

/// Rows followed by a one-line total.
pub fn render_divergences(rows: &[DivergenceRow]) -> String {
    let mut out = String::from(DIVERGENCE_HEADER);
    out.push('\n');
    for r in rows {
        let _ = writeln!(out, "{}\t{}\t{}", r.date, r.step, r.iterations_at_abort);
    }
    let _ = writeln!(out, "{SUMMARY_PREFIX}{}", rows.len());
    out
}

fn fields(line: &str, index: usize) -> ResultsResult<(String, usize, u32)> {
    let malformed = || ResultsError::MalformedReport {
        line: index + 1,
        content: line.to_string(),
    };
    let mut parts = line.split('\t');
    let date = parts.next().ok_or_else(malformed)?.to_string();
    let step = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(malformed)?;
    let count = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(malformed)?;
    if parts.next().is_some() {
        return Err(malformed());
    }
    Ok((date, step, count))
}

fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, l)| !l.trim().is_empty() && !l.starts_with('#'))
}

pub fn parse_iterations(text: &str) -> ResultsResult<Vec<IterationRow>> {
    data_lines(text)
        .map(|(i, l)| {
            let (date, step, iterations) = fields(l, i)?;
            Ok(IterationRow {
                date,
                step,
                iterations,
            })
        })
        .collect()
}

pub fn parse_divergences(text: &str) -> ResultsResult<Vec<DivergenceRow>> {
    data_lines(text)
        .map(|(i, l)| {
            let (date, step, iterations_at_abort) = fields(l, i)?;
            Ok(DivergenceRow {
                date,
                step,
                iterations_at_abort,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divergence_report_ends_with_total() {
        let rows = vec![DivergenceRow {
            date: "2026-01-01 03:00:00".to_string(),
            step: 3,
            iterations_at_abort: 20,
        }];
        let text = render_divergences(&rows);
        assert_eq!(
            text,
            "date\tstep\titerations_at_abort\n2026-01-01 03:00:00\t3\t20\n# divergent steps: 1\n"
        );
        assert_eq!(parse_divergences(&text).unwrap(), rows);
    }

    #[test]
    fn malformed_line_reports_position() {
        let text = format!("{ITERATION_HEADER}\n2026-01-01 00:00:00\tx\t3\n");
        match parse_iterations(&text) {
            Err(ResultsError::MalformedReport { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
