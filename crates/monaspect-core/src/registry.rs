//! Ordered, immutable catalogue of upstream providers.
//!
//! A [`SourceDescriptor`] pairs a fetch target with the pure transform that
//! turns the provider's body into canonical records. Descriptors are generic
//! over the record type so the market, history and news lanes share one
//! gateway and one coordinator.

use std::collections::HashSet;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use serde::Serialize;

use crate::fetch_error::TransformError;
use crate::{Symbol, Timeframe, ValidationError};

/// Role of a source inside a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Primary,
    Secondary,
    Synthetic,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Synthetic => "synthetic",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request parameters handed to endpoint builders, transforms and generators.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchParams {
    pub limit: usize,
    pub symbol: Option<Symbol>,
    pub asset_id: Option<String>,
    pub timeframe: Timeframe,
    pub base_price: Option<f64>,
}

impl FetchParams {
    pub fn market(limit: usize) -> Self {
        Self {
            limit,
            symbol: None,
            asset_id: None,
            timeframe: Timeframe::OneDay,
            base_price: None,
        }
    }

    pub fn history(
        symbol: Symbol,
        asset_id: Option<String>,
        timeframe: Timeframe,
        base_price: Option<f64>,
    ) -> Self {
        Self {
            limit: 0,
            symbol: Some(symbol),
            asset_id,
            timeframe,
            base_price,
        }
    }

    pub fn news() -> Self {
        Self::market(0)
    }
}

/// Pure body-to-records transform.
pub type TransformFn<T> = fn(&str, &FetchParams) -> Result<Vec<T>, TransformError>;

/// Local record generator for synthetic sources.
pub type GeneratorFn<T> = fn(&FetchParams) -> Result<Vec<T>, TransformError>;

/// Where a remote source is fetched from.
#[derive(Clone)]
pub enum Endpoint {
    Fixed(String),
    /// Builds the URL from request parameters; `None` means the source
    /// cannot serve this request.
    Builder(fn(&FetchParams) -> Option<String>),
}

impl Endpoint {
    pub fn url_for(&self, params: &FetchParams) -> Option<String> {
        match self {
            Self::Fixed(url) => Some(url.clone()),
            Self::Builder(build) => build(params),
        }
    }
}

impl Debug for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(url) => f.debug_tuple("Fixed").field(url).finish(),
            Self::Builder(_) => f.write_str("Builder(..)"),
        }
    }
}

pub(crate) enum Target<T> {
    Remote {
        endpoint: Endpoint,
        transform: Option<TransformFn<T>>,
    },
    Synthetic(GeneratorFn<T>),
}

/// One upstream provider (or the local synthetic generator).
pub struct SourceDescriptor<T> {
    name: String,
    kind: SourceKind,
    target: Target<T>,
}

impl<T> SourceDescriptor<T> {
    /// Remote provider with a transform.
    pub fn remote(
        name: impl Into<String>,
        kind: SourceKind,
        endpoint: Endpoint,
        transform: TransformFn<T>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: Target::Remote {
                endpoint,
                transform: Some(transform),
            },
        }
    }

    /// Listed provider without a transform. Attempts fail fast with
    /// `Disabled` and never reach the network.
    pub fn disabled(name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Secondary,
            target: Target::Remote {
                endpoint,
                transform: None,
            },
        }
    }

    pub fn synthetic(name: impl Into<String>, generator: GeneratorFn<T>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Synthetic,
            target: Target::Synthetic(generator),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    pub const fn is_synthetic(&self) -> bool {
        matches!(self.kind, SourceKind::Synthetic)
    }

    pub const fn is_enabled(&self) -> bool {
        match &self.target {
            Target::Remote { transform, .. } => transform.is_some(),
            Target::Synthetic(_) => true,
        }
    }

    pub(crate) fn target(&self) -> &Target<T> {
        &self.target
    }
}

impl<T> Debug for SourceDescriptor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let endpoint = match &self.target {
            Target::Remote { endpoint, .. } => Some(endpoint),
            Target::Synthetic(_) => None,
        };
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .field("endpoint", &endpoint)
            .finish()
    }
}

/// Immutable, ordered set of descriptors with unique names.
#[derive(Debug)]
pub struct SourceRegistry<T> {
    descriptors: Vec<Arc<SourceDescriptor<T>>>,
}

impl<T> Clone for SourceRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            descriptors: self.descriptors.clone(),
        }
    }
}

impl<T> SourceRegistry<T> {
    pub fn new(descriptors: Vec<SourceDescriptor<T>>) -> Result<Self, ValidationError> {
        if descriptors.is_empty() {
            return Err(ValidationError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.name.to_ascii_lowercase()) {
                return Err(ValidationError::DuplicateSource {
                    name: descriptor.name.clone(),
                });
            }
        }

        Ok(Self {
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn descriptors(&self) -> &[Arc<SourceDescriptor<T>>] {
        &self.descriptors
    }

    /// Non-synthetic descriptors in registry order, disabled ones included.
    pub fn real_sources(&self) -> Vec<Arc<SourceDescriptor<T>>> {
        self.descriptors
            .iter()
            .filter(|descriptor| !descriptor.is_synthetic())
            .cloned()
            .collect()
    }

    /// First synthetic descriptor, if one is registered.
    pub fn synthetic(&self) -> Option<Arc<SourceDescriptor<T>>> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.is_synthetic())
            .cloned()
    }

    pub fn find(&self, name: &str) -> Option<Arc<SourceDescriptor<T>>> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
