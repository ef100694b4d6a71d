//! Co-simulation runtime contract.
//!
//! The coordinator never talks to a transport directly. It drives a
//! [`CosimRuntime`]: register channels, publish and read doubles, and block on
//! synchronized time requests. [`loopback`] provides an in-process runtime
//! whose barrier exchanges values with a scripted [`PeerFederate`].

pub mod error;
pub mod loopback;
pub mod peer;
pub mod runtime;

pub use error::{RuntimeError, RuntimeResult};
pub use loopback::{LoopbackConfig, LoopbackRuntime};
pub use peer::{NodeDemand, PeerFederate, TransmissionPeer};
pub use runtime::{
    CosimRuntime, Grant, IterationRequest, IterationResult, PublicationHandle,
    SubscriptionHandle, ValueType,
};
