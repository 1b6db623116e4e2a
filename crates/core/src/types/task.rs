//! Description of a task as seen by the artifact state engine

use crate::types::files::FileSet;
use crate::types::identity::{ImplementationIdentity, TaskIdentity};
use crate::types::values::InputValue;
use std::collections::BTreeMap;

/// The declared inputs and outputs of one task in the current build
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub identity: TaskIdentity,
    pub implementation: ImplementationIdentity,
    pub input_properties: BTreeMap<String, InputValue>,
    pub input_files: BTreeMap<String, FileSet>,
    pub output_files: BTreeMap<String, FileSet>,
}

impl TaskDescriptor {
    pub fn new(
        identity: impl Into<TaskIdentity>,
        implementation: impl Into<ImplementationIdentity>,
    ) -> Self {
        Self {
            identity: identity.into(),
            implementation: implementation.into(),
            input_properties: BTreeMap::new(),
            input_files: BTreeMap::new(),
            output_files: BTreeMap::new(),
        }
    }

    pub fn with_input_property(mut self, name: impl Into<String>, value: InputValue) -> Self {
        self.input_properties.insert(name.into(), value);
        self
    }

    pub fn with_input_files(mut self, name: impl Into<String>, files: FileSet) -> Self {
        self.input_files.insert(name.into(), files);
        self
    }

    pub fn with_output_files(mut self, name: impl Into<String>, files: FileSet) -> Self {
        self.output_files.insert(name.into(), files);
        self
    }
}
