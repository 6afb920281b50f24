//! Arithmetic over positional JSON arguments.

use ext_direct::{Action, CallArg, HandlerError, Method};
use serde_json::{Value, json};

fn number(args: &[CallArg], index: usize) -> Result<f64, HandlerError> {
    args.get(index)
        .and_then(CallArg::value)
        .and_then(Value::as_f64)
        .ok_or_else(|| HandlerError::new(format!("argument {} must be a number", index)))
}

pub fn action() -> Action {
    Action::new("Calculator")
        .with_locator(module_path!())
        .method(
            Method::new("add", |args: Vec<CallArg>| async move {
                Ok(json!(number(&args, 0)? + number(&args, 1)?))
            })
            .with_len(2),
        )
        .method(
            Method::new("div", |args: Vec<CallArg>| async move {
                let dividend = number(&args, 0)?;
                let divisor = number(&args, 1)?;
                if divisor == 0.0 {
                    return Err(HandlerError::new("division by zero"));
                }
                Ok(json!(dividend / divisor))
            })
            .with_len(2),
        )
}
