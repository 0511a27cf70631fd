/// Process exit status reported by a finished dispatch.
///
/// The numeric values follow the conventional shell codes: `0` for success,
/// `1` for a generic error and `4` for a resource that could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    Success,
    Error,
    UnknownFile,
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Error => 1,
            ExitStatus::UnknownFile => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitStatus::Success => "success",
            ExitStatus::Error => "error",
            ExitStatus::UnknownFile => "unknown_file",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }
}

impl From<ExitStatus> for i32 {
    fn from(status: ExitStatus) -> Self {
        status.code()
    }
}
