//! Signal references and typed signal handles.
//!
//! Signals are addressed by dot-separated hierarchical paths such as
//! `Vehicle.Cabin.HVAC.IsAirConditioningActive`. The broker additionally
//! assigns each signal a numeric id; operations on the provider stream
//! (publish, ack correlation) require the id, so a [`SignalRef`] without a
//! resolved id cannot be used for them.

use crate::value::SignalValue;
use std::fmt;
use std::marker::PhantomData;

/// A signal path with an optionally resolved numeric id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalRef {
    path: String,
    id: Option<i32>,
}

impl SignalRef {
    /// Creates an unresolved reference from a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: None,
        }
    }

    /// Attaches the broker-assigned numeric id.
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The resolved numeric id, if resolution has happened.
    pub fn id(&self) -> Option<i32> {
        self.id
    }
}

impl fmt::Display for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} (id={})", self.path, id),
            None => write!(f, "{}", self.path),
        }
    }
}

/// A read-only, dynamic signal (e.g. speed, temperature).
pub struct Sensor<T: SignalValue> {
    path: String,
    _marker: PhantomData<fn() -> T>,
}

/// A signal with a commanded target and a reported actual value.
pub struct Actuator<T: SignalValue> {
    path: String,
    _marker: PhantomData<fn() -> T>,
}

/// Static or semi-static vehicle metadata (e.g. VIN, door count).
pub struct Attribute<T: SignalValue> {
    path: String,
    _marker: PhantomData<fn() -> T>,
}

macro_rules! impl_signal_handle {
    ($name:ident) => {
        impl<T: SignalValue> $name<T> {
            pub fn new(path: impl Into<String>) -> Self {
                Self {
                    path: path.into(),
                    _marker: PhantomData,
                }
            }

            pub fn path(&self) -> &str {
                &self.path
            }
        }

        impl<T: SignalValue> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    path: self.path.clone(),
                    _marker: PhantomData,
                }
            }
        }

        impl<T: SignalValue> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("path", &self.path)
                    .finish()
            }
        }
    };
}

impl_signal_handle!(Sensor);
impl_signal_handle!(Actuator);
impl_signal_handle!(Attribute);
