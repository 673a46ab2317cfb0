//! Descriptions, arguments and factories
//!
//! A description is the serializable recipe for one presentation model. An
//! application declares a single closed enum of descriptions and a factory that
//! matches on it exhaustively, so adding a screen without teaching the factory
//! about it fails to compile.

use crate::pm::model::PresentationModel;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Marker for description types. Implemented for every type with the required bounds.
pub trait PmDescription: Clone + PartialEq + Debug + Serialize + DeserializeOwned + 'static {}

impl<T> PmDescription for T where T: Clone + PartialEq + Debug + Serialize + DeserializeOwned + 'static
{}

/// Builds presentation models from descriptions. Construction only: hooks run
/// later, when the tree drives the new node.
pub trait PmFactory<D: PmDescription> {
    fn create(&self, description: &D) -> Box<dyn PresentationModel<D>>;
}

impl<D, F> PmFactory<D> for F
where
    D: PmDescription,
    F: Fn(&D) -> Box<dyn PresentationModel<D>>,
{
    fn create(&self, description: &D) -> Box<dyn PresentationModel<D>> {
        self(description)
    }
}

pub const DEFAULT_ROOT_TAG: &str = "root";

/// Arguments for the root presentation model of a delegate
#[derive(Debug, Clone, PartialEq)]
pub struct PmArgs<D> {
    pub description: D,
    pub tag: String,
}

impl<D: PmDescription> PmArgs<D> {
    pub fn new(description: D) -> Self {
        Self {
            description,
            tag: DEFAULT_ROOT_TAG.to_string(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}
