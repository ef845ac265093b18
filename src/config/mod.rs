pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{
    apply_transform, apply_transforms, check_expectations, project_builder, ApplicationError,
    ExpectationOutcome, TransformResult,
};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    ExpectedValue, Expectation, Metadata, Operation, TransformDefinition, TransformScript,
    ValidationError, ValidationIssue,
};
