use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn precondition(check: Precondition, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::PreconditionViolation {
                check,
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn out_of_memory(requested: usize) -> Error {
        Error(ErrorKind::OutOfMemory { requested }.into())
    }

    pub fn native<E>(context: impl Into<String>, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::NativeBridgeFailure {
                context: context.into(),
                source: source.into(),
            }
            .into(),
        )
    }

    /// Returns the violated precondition, if this is a precondition error.
    pub fn precondition_check(&self) -> Option<Precondition> {
        match self.kind() {
            ErrorKind::PreconditionViolation { check, .. } => Some(*check),
            _ => None,
        }
    }

    pub fn is_invalid_arg(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidArgument { .. })
    }

    pub fn is_native_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::NativeBridgeFailure { .. })
    }

    pub fn is_out_of_memory(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfMemory { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("precondition violated ({check}): {message}")]
    PreconditionViolation { check: Precondition, message: String },

    #[error("failed to allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("native call failed: {context}")]
    NativeBridgeFailure {
        context: String,
        #[source]
        source: StdErrorBoxed,
    },
}

/// The caller-side checks performed before a buffer crosses into the native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precondition {
    /// The buffer is managed/relocatable instead of directly addressable.
    NotDirect,
    /// The buffer's declared byte order differs from the host order.
    NonNativeOrder,
    /// The buffer does not permit writes.
    ReadOnly,
    /// The element type is not accepted on the buffer path.
    UnsupportedType,
}

impl Precondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precondition::NotDirect => "not_direct",
            Precondition::NonNativeOrder => "non_native_order",
            Precondition::ReadOnly => "read_only",
            Precondition::UnsupportedType => "unsupported_type",
        }
    }
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::invalid_arg("alignment", "must be a power of two");
        assert_eq!(
            e.to_string(),
            "invalid argument alignment: must be a power of two"
        );

        let e = Error::precondition(Precondition::ReadOnly, "the input buffer is read-only");
        assert_eq!(
            e.to_string(),
            "precondition violated (read_only): the input buffer is read-only"
        );
        assert_eq!(e.precondition_check(), Some(Precondition::ReadOnly));
        assert!(!e.is_invalid_arg());
    }

    #[test]
    fn test_native_failure_keeps_source() {
        let io = std::io::Error::other("device lost");
        let e = Error::native("allocate tensor", io);
        assert!(e.is_native_failure());
        let source = std::error::Error::source(&e).expect("source");
        assert_eq!(source.to_string(), "device lost");
    }

    #[test]
    fn test_out_of_memory() {
        let e = Error::out_of_memory(1 << 40);
        assert!(e.is_out_of_memory());
        assert!(!e.is_invalid_arg());
        assert_eq!(e.to_string(), "failed to allocate 1099511627776 bytes");
    }

    #[test]
    fn test_into_kind() {
        let e = Error::invalid_operation("write to read-only buffer");
        match e.into_kind() {
            ErrorKind::InvalidOperation { name } => assert_eq!(name, "write to read-only buffer"),
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
