//! Anti-forgery token pair bound to the transport session.
//!
//! Every descriptor publish carries a double token: `token1` travels as a
//! cookie and doubles as the session id, `token2` lives in the session store
//! and is echoed to the client through a header and the interceptor snippet.
//! Both are expected back as request headers on every subsequent client
//! call. Verification of incoming tokens belongs to the surrounding
//! transport layer, not to this crate.
//!
//! Issuance is a pure function of (existing session state, request cookies):
//! once a pair exists for a live session it is reused verbatim, since
//! regenerating mid-session would invalidate every in-flight client request.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::session::SessionStore;

/// Cookie carrying the first token.
pub const TOKEN1_COOKIE: &str = "Ext-Direct-Token1";
/// Session key holding the second token.
pub const TOKEN2_SESSION_KEY: &str = "Ext-Direct-Token2";
/// Response header announcing the first token.
pub const SET_TOKEN1_HEADER: &str = "Set-Ext-Direct-Token1";
/// Response header announcing the second token.
pub const SET_TOKEN2_HEADER: &str = "Set-Ext-Direct-Token2";

/// The session-bound token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Cookie-borne token; also the session id.
    pub token1: String,
    /// Session-stored token.
    pub token2: String,
}

/// 16 random bytes as 32 lowercase hex characters.
fn fresh_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Create or reuse the token pair for the session implied by `cookies`.
///
/// A `token1` cookie on the request names an existing session; otherwise a
/// new token is generated and becomes the session id. `token2` is read from
/// the session when present and written back in either case.
pub async fn issue(store: &dyn SessionStore, cookies: &BTreeMap<String, String>) -> TokenPair {
    let token1 = match cookies.get(TOKEN1_COOKIE) {
        Some(existing) => existing.clone(),
        None => fresh_token(),
    };

    let token2 = match store.get(&token1, TOKEN2_SESSION_KEY).await {
        Some(existing) => existing,
        None => fresh_token(),
    };
    store.set(&token1, TOKEN2_SESSION_KEY, &token2).await;

    tracing::debug!(session = %token1, "token pair issued");

    TokenPair { token1, token2 }
}

/// Client-side override attaching both tokens as headers on all future
/// client calls. Appended verbatim to the descriptor publish body.
pub fn interceptor_snippet(pair: &TokenPair) -> String {
    format!(
        "Ext.define('Ext.overrides.data.Connection',{{\
         override:'Ext.data.Connection',request:function(o){{o=Ext.apply(o||{{}},{{\
         withCredentials:true,cors:true,\
         headers:{{'Ext-Direct-Token1':'{}','Ext-Direct-Token2':'{}'}}}});\
         this.callParent([o]);}}}});",
        pair.token1, pair.token2
    )
}
