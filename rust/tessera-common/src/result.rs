pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_capacity(capacity: usize) -> super::Result<usize> {
        verify_arg!(capacity, capacity <= 1024);
        Ok(capacity)
    }

    #[test]
    fn test_verify_arg_macro() {
        assert_eq!(check_capacity(16).unwrap(), 16);

        let err = check_capacity(4096).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "capacity");
                assert_eq!(message, "capacity <= 1024");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
