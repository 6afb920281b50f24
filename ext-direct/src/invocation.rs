//! Invocation: parameter binding, execution, and result post-processing.
//!
//! One invocation owns a resolved method, its raw or form-style arguments,
//! and any uploads, and always yields exactly one [`InvocationResult`].
//! Handler failures are recovered here into `exception` envelopes; transform
//! failures are not, since transforms are protocol infrastructure rather
//! than handler business logic.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::call::{Call, CallArg, CallMeta, CallOutcome, InvocationResult};
use crate::error::{HandlerError, RouteError, RouteResult};
use crate::registry::{BoxedMethodHandler, MethodDescriptor, ResultTransform};
use crate::transport::UploadedFile;

enum InvocationArgs {
    /// Raw RPC payload, bound positionally.
    Positional(Value),
    /// Stripped form fields plus uploads, bound by declared parameter name.
    Named {
        fields: BTreeMap<String, String>,
        uploads: BTreeMap<String, UploadedFile>,
    },
}

/// A pending call bound to its resolved method.
pub struct Invocation {
    meta: CallMeta,
    descriptor: MethodDescriptor,
    handler: BoxedMethodHandler,
    transform: Option<ResultTransform>,
    args: InvocationArgs,
}

impl Invocation {
    /// Pair a routed call with its resolved method.
    pub fn new(
        call: &Call,
        descriptor: MethodDescriptor,
        handler: BoxedMethodHandler,
        transform: Option<ResultTransform>,
    ) -> Self {
        let args = match call {
            Call::Rpc { data, .. } => InvocationArgs::Positional(data.clone()),
            Call::Form {
                fields, uploads, ..
            } => InvocationArgs::Named {
                fields: fields.clone(),
                uploads: uploads.clone(),
            },
        };
        Self {
            meta: call.meta(),
            descriptor,
            handler,
            transform,
            args,
        }
    }

    /// Bind the argument list for the target method.
    ///
    /// Positional payloads pass through unmodified: an array becomes the
    /// argument list, null becomes no arguments, anything else a single
    /// argument. Named binding walks the declared parameters in order,
    /// preferring a same-named form field, then a same-named upload, then
    /// the declared default, then null.
    fn bind(&self) -> Result<Vec<CallArg>, HandlerError> {
        match &self.args {
            InvocationArgs::Positional(data) => {
                let args: Vec<CallArg> = match data {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items.iter().cloned().map(CallArg::Value).collect(),
                    other => vec![CallArg::Value(other.clone())],
                };

                if let Some(len) = self.descriptor.len {
                    if args.len() != len {
                        return Err(HandlerError::new(format!(
                            "method {}.{} expects {} argument(s), got {}",
                            self.meta.action,
                            self.meta.method,
                            len,
                            args.len()
                        )));
                    }
                }
                Ok(args)
            }
            InvocationArgs::Named { fields, uploads } => {
                let args = self
                    .descriptor
                    .params
                    .iter()
                    .map(|param| {
                        if let Some(field) = fields.get(&param.name) {
                            CallArg::Value(Value::String(field.clone()))
                        } else if let Some(file) = uploads.get(&param.name) {
                            CallArg::File(file.clone())
                        } else if let Some(default) = &param.default {
                            CallArg::Value(default.clone())
                        } else {
                            CallArg::Value(Value::Null)
                        }
                    })
                    .collect();
                Ok(args)
            }
        }
    }

    fn apply_transform(
        &self,
        transform: &ResultTransform,
        result: Option<Value>,
        error: Option<&HandlerError>,
    ) -> RouteResult<Value> {
        transform(&self.meta, result, error).map_err(|err| RouteError::Transform {
            action: self.meta.action.clone(),
            method: self.meta.method.clone(),
            message: err.message,
        })
    }

    /// Execute the invocation.
    ///
    /// Handler errors (including argument-count mismatches) become
    /// `exception` outcomes; when a transform is registered its return value
    /// becomes the final result on both paths, so it can normalize error
    /// shapes as well as success shapes. Transform failures abort the whole
    /// request.
    #[tracing::instrument(skip(self), fields(action = %self.meta.action, method = %self.meta.method))]
    pub async fn run(&self) -> RouteResult<InvocationResult> {
        let outcome = match self.bind() {
            Ok(args) => {
                tracing::trace!(args = args.len(), "arguments bound");
                match (self.handler)(args).await {
                    Ok(raw) => {
                        let result = match &self.transform {
                            Some(transform) => {
                                self.apply_transform(transform, Some(raw), None)?
                            }
                            None => raw,
                        };
                        CallOutcome::Rpc { result }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "handler raised");
                        match &self.transform {
                            Some(transform) => {
                                let result =
                                    self.apply_transform(transform, None, Some(&err))?;
                                CallOutcome::Rpc { result }
                            }
                            None => CallOutcome::Exception {
                                message: err.message,
                                trace: err.trace.unwrap_or_default(),
                            },
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "argument binding failed");
                CallOutcome::Exception {
                    message: err.message,
                    trace: err.trace.unwrap_or_default(),
                }
            }
        };

        Ok(InvocationResult {
            action: self.meta.action.clone(),
            method: self.meta.method.clone(),
            outcome,
            tid: self.meta.tid.clone(),
        })
    }
}
