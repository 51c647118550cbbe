pub mod compose;
pub mod console;
pub mod deploy;
pub mod engine;
pub mod environment;
pub mod error;
pub mod files;
pub mod interrupt;
pub mod pipeline;
pub mod quickstart;
pub mod select;
pub mod template;

pub use compose::{ComposeDocument, GeneratedCompose};
pub use console::{Console, Severity};
pub use deploy::{DeployOptions, DeployOutcome, Deployer};
pub use engine::{DEFAULT_DOCKER_BIN, DOCKER_BIN_ENV, EngineInfo};
pub use environment::{Environment, Variables};
pub use error::*;
pub use interrupt::Interrupt;
pub use pipeline::{
    CommandRunner, PipelineReport, ShellRunner, SubtaskOutcome, SubtaskStatus, format_duration,
};
pub use quickstart::{Quickstart, QuickstartOptions, Scaffold};
pub use template::TemplateError;
