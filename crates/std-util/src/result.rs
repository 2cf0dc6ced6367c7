/// Unwraps the `Err` variant of a result, panicking with the `Ok` value
/// otherwise. Extra arguments are formatted into the panic message.
#[macro_export]
macro_rules! assert_err {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Err(e) => e,
            Ok(actual) => {
                use std::fmt::Write;
                let mut msg = format!("expected `Err`; actual=Ok({:?})", actual);

                $(
                    write!(msg, ", ").unwrap();
                    write!(msg, $($t)*).unwrap();
                )?

                panic!("{}", msg);
            }
        }
    };
}

/// Unwraps the `Ok` variant of a result, panicking with the error's display
/// text otherwise.
#[macro_export]
macro_rules! assert_ok {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(err) => panic!("expected `Ok`; actual=Err({})", err),
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn unwraps_ok() {
        let res: Result<i32, String> = Ok(3);
        assert_eq!(assert_ok!(res), 3);
    }

    #[test]
    fn unwraps_err() {
        let res: Result<i32, String> = Err("boom".to_string());
        assert_eq!(assert_err!(res), "boom");
    }

    #[test]
    #[should_panic(expected = "expected `Err`; actual=Ok(1), while checking")]
    fn err_on_ok_panics_with_context() {
        let res: Result<i32, String> = Ok(1);
        assert_err!(res, "while checking");
    }
}
