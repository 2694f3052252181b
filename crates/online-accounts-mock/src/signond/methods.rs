//! Static method table of the signond mock.

use serde_json::{Value, json};

use super::{
    AUTH_SERVICE_IFACE, AUTH_SESSION_IFACE, IDENTITY_IFACE, MOCK_IFACE, Reply, SignonState,
    VariantMap, process_params,
};
use crate::error::{SignonError, SignonResult};

type Handler = fn(&mut SignonState, &str, &[Value]) -> SignonResult<Reply>;

/// One exported method.
#[derive(Debug)]
pub struct MethodEntry {
    pub interface: &'static str,
    pub name: &'static str,
    /// D-Bus input signature, for reference.
    pub in_signature: &'static str,
    /// D-Bus output signature, for reference.
    pub out_signature: &'static str,
    pub(super) handler: Handler,
}

pub static METHODS: &[MethodEntry] = &[
    MethodEntry {
        interface: AUTH_SERVICE_IFACE,
        name: "getIdentity",
        in_signature: "u",
        out_signature: "oa{sv}",
        handler: get_identity,
    },
    MethodEntry {
        interface: AUTH_SERVICE_IFACE,
        name: "getAuthSessionObjectPath",
        in_signature: "us",
        out_signature: "s",
        handler: get_auth_session_object_path,
    },
    MethodEntry {
        interface: MOCK_IFACE,
        name: "AddIdentity",
        in_signature: "ua{sv}",
        out_signature: "",
        handler: add_identity,
    },
    MethodEntry {
        interface: IDENTITY_IFACE,
        name: "getInfo",
        in_signature: "",
        out_signature: "a{sv}",
        handler: get_info,
    },
    MethodEntry {
        interface: IDENTITY_IFACE,
        name: "store",
        in_signature: "a{sv}",
        out_signature: "u",
        handler: store,
    },
    MethodEntry {
        interface: AUTH_SESSION_IFACE,
        name: "process",
        in_signature: "a{sv}s",
        out_signature: "a{sv}",
        handler: process,
    },
];

pub(super) fn lookup(interface: &str, name: &str) -> Option<&'static MethodEntry> {
    METHODS.iter().find(|m| m.interface == interface && m.name == name)
}

// ─── Argument decoding ───────────────────────────────────────────────────────

fn arg<'a>(args: &'a [Value], index: usize) -> SignonResult<&'a Value> {
    args.get(index).ok_or_else(|| SignonError::invalid_args(format!("Missing argument {index}")))
}

fn arg_u32(args: &[Value], index: usize) -> SignonResult<u32> {
    arg(args, index)?
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| SignonError::invalid_args(format!("Argument {index} must be a uint32")))
}

fn arg_str(args: &[Value], index: usize) -> SignonResult<&str> {
    arg(args, index)?
        .as_str()
        .ok_or_else(|| SignonError::invalid_args(format!("Argument {index} must be a string")))
}

fn arg_map(args: &[Value], index: usize) -> SignonResult<VariantMap> {
    match arg(args, index)? {
        Value::Object(map) => Ok(map.clone().into_iter().collect()),
        _ => Err(SignonError::invalid_args(format!("Argument {index} must be a dictionary"))),
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

fn get_identity(state: &mut SignonState, _path: &str, args: &[Value]) -> SignonResult<Reply> {
    let (path, info) = state.get_identity(arg_u32(args, 0)?)?;
    Ok(Reply::new(json!([path, info])))
}

fn get_auth_session_object_path(
    state: &mut SignonState,
    _path: &str,
    args: &[Value],
) -> SignonResult<Reply> {
    let path = state.get_auth_session_object_path(arg_u32(args, 0)?, arg_str(args, 1)?)?;
    Ok(Reply::new(Value::String(path)))
}

fn add_identity(state: &mut SignonState, _path: &str, args: &[Value]) -> SignonResult<Reply> {
    state.add_identity(arg_u32(args, 0)?, arg_map(args, 1)?);
    Ok(Reply::unit())
}

fn get_info(state: &mut SignonState, path: &str, _args: &[Value]) -> SignonResult<Reply> {
    let info = state.identity_info(path)?;
    Ok(Reply::new(Value::Object(info.into_iter().collect())))
}

fn store(state: &mut SignonState, path: &str, args: &[Value]) -> SignonResult<Reply> {
    state.identity_store(path, arg_map(args, 0)?).map(Reply::new)
}

fn process(_state: &mut SignonState, _path: &str, args: &[Value]) -> SignonResult<Reply> {
    // The method name (second argument) is accepted but not used.
    arg_str(args, 1)?;
    process_params(arg_map(args, 0)?)
}
