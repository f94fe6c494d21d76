//! Property table kept by every demo device.

use mmdevice_sys::{PROPERTY_FLOAT, PROPERTY_INTEGER, PROPERTY_STRING};
use std::ffi::c_int;

/// One named property with its metadata and current value.
#[derive(Debug, Clone)]
pub(crate) struct Property {
    pub name: &'static str,
    pub value: String,
    pub property_type: c_int,
    pub read_only: bool,
    pub limits: Option<(f64, f64)>,
    pub allowed: Vec<String>,
}

impl Property {
    pub fn string(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            property_type: PROPERTY_STRING,
            read_only: false,
            limits: None,
            allowed: Vec::new(),
        }
    }

    pub fn float(name: &'static str, value: f64) -> Self {
        Self {
            property_type: PROPERTY_FLOAT,
            ..Self::string(name, format_float(value))
        }
    }

    pub fn integer(name: &'static str, value: i64) -> Self {
        Self {
            property_type: PROPERTY_INTEGER,
            ..Self::string(name, value.to_string())
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.limits = Some((lower, upper));
        self
    }

    pub fn with_allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `value` parses for this property's type and satisfies its
    /// allowed-value list and limits.
    pub fn accepts(&self, value: &str) -> bool {
        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == value) {
            return false;
        }
        let number = match self.property_type {
            PROPERTY_FLOAT => value.trim().parse::<f64>().ok(),
            PROPERTY_INTEGER => value.trim().parse::<i64>().ok().map(|v| v as f64),
            _ => return true,
        };
        match (number, self.limits) {
            (None, _) => false,
            (Some(v), Some((lower, upper))) => v >= lower && v <= upper,
            (Some(_), None) => true,
        }
    }
}

pub(crate) fn format_float(value: f64) -> String {
    format!("{value:.4}")
}
