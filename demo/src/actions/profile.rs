//! Form-handled profile updates with an avatar upload.

use ext_direct::{Action, CallArg, Method};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct ProfileUpdate {
    name: Option<String>,
    bio: String,
    avatar_bytes: usize,
}

pub fn action() -> Action {
    Action::new("Profile")
        .with_locator(module_path!())
        .method(
            Method::new("update", |args: Vec<CallArg>| async move {
                let update = ProfileUpdate {
                    name: args[0].as_str().map(str::to_string),
                    bio: args[2].as_str().unwrap_or_default().to_string(),
                    avatar_bytes: args[1].file().map(|f| f.size()).unwrap_or(0),
                };
                Ok(serde_json::to_value(update)?)
            })
            .form_handler()
            .with_param("name")
            .with_param("avatar")
            .with_param_default("bio", json!("(no bio)"))
            // Ext form panels expect a {success, data} envelope back.
            .with_transform(|_meta, result, error| match error {
                None => Ok(json!({"success": true, "data": result})),
                Some(err) => Ok(json!({"success": false, "message": err.message})),
            }),
        )
}
