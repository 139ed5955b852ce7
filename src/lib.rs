pub mod api;
pub mod context;
pub mod converter;
pub mod error;
pub mod events;
pub mod nodes;
pub mod program;
pub mod project;
pub mod reflection;
pub mod registry;
pub mod resolver;
pub mod type_converter;
pub mod types;
pub mod utils;

pub use api::{convert, ConverterOptions};
pub use context::{Context, Phase};
pub use converter::{Converter, ConverterState};
pub use error::{ConvertError, ConvertWarning, SemanticError};
pub use events::{Event, EventBus, EventContext, EventKind, SubscriptionId};
pub use program::{Program, ProgramBuilder, ProgramOracle};
pub use project::ProjectReflection;
pub use reflection::{Reflection, ReflectionId, ReflectionKind};
pub use registry::{HandlerId, NodeConverter, NodeConverterRegistry};
pub use resolver::DanglingReference;
pub use types::Type;
