use thiserror::Error;

#[derive(Error, Debug)]
pub enum SesPilotError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("No ses-pilot configuration found. Run `ses-pilot init` first.")]
    NotConfigured,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Remote template not found: {0}")]
    RemoteNotFound(String),

    #[error("AWS CLI failed ({command}): {stderr}")]
    AwsCli { command: String, stderr: String },

    #[error("AWS CLI could not be started: {0}")]
    AwsCliUnavailable(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl SesPilotError {
    /// Text inspected by the substring checks on remote failures.
    pub fn remote_message(&self) -> String {
        match self {
            SesPilotError::AwsCli { stderr, .. } => stderr.clone(),
            SesPilotError::RemoteNotFound(name) => format!("NotFoundException: {}", name),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SesPilotError>;
