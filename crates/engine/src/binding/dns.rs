// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `DNS` script binding.
//!
//! Synchronous queries block the calling runner's thread; the async form
//! suspends the runner and resolves inside its work-item. Failures come
//! back as `null` with the error noted in `lastError`.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::Resolver;

use tandem_script::native::{arg_bool, arg_str, native_fn, NativeOutcome};
use tandem_script::{ObjKind, ScriptContext, Value, WorkItem};
use tandem_threads as threads;

static RESOLVER: Lazy<Option<Resolver>> = Lazy::new(|| {
    Resolver::from_system_conf()
        .or_else(|_| Resolver::new(ResolverConfig::default(), ResolverOpts::default()))
        .map_err(|e| {
            debug!(error = %e, "no usable DNS resolver");
            e
        })
        .ok()
});

/// One resolved answer as plain data, convertible into script values.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Answer {
    Text(String),
    Srv { priority: u16, weight: u16, port: u16, target: String },
    Naptr { order: u16, pref: u16, flags: String, service: String, regexp: String, repl: String },
}

fn resolve(qtype: &str, name: &str) -> Option<Vec<Answer>> {
    let resolver = RESOLVER.as_ref()?;
    let out: Vec<Answer> = match qtype {
        "A" => resolver
            .ipv4_lookup(name)
            .map_err(note_dns_error)
            .ok()?
            .iter()
            .map(|ip| Answer::Text(ip.to_string()))
            .collect(),
        "AAAA" => resolver
            .ipv6_lookup(name)
            .map_err(note_dns_error)
            .ok()?
            .iter()
            .map(|ip| Answer::Text(ip.to_string()))
            .collect(),
        "TXT" => resolver
            .txt_lookup(name)
            .map_err(note_dns_error)
            .ok()?
            .iter()
            .map(|txt| Answer::Text(txt.to_string()))
            .collect(),
        "SRV" => resolver
            .srv_lookup(name)
            .map_err(note_dns_error)
            .ok()?
            .iter()
            .map(|srv| Answer::Srv {
                priority: srv.priority(),
                weight: srv.weight(),
                port: srv.port(),
                target: srv.target().to_utf8(),
            })
            .collect(),
        "NAPTR" => resolver
            .lookup(name, RecordType::NAPTR)
            .map_err(note_dns_error)
            .ok()?
            .iter()
            .filter_map(|rdata| match rdata {
                RData::NAPTR(n) => Some(Answer::Naptr {
                    order: n.order(),
                    pref: n.preference(),
                    flags: String::from_utf8_lossy(n.flags()).to_string(),
                    service: String::from_utf8_lossy(n.services()).to_string(),
                    regexp: String::from_utf8_lossy(n.regexp()).to_string(),
                    repl: n.replacement().to_utf8(),
                }),
                _ => None,
            })
            .collect(),
        _ => return None,
    };
    Some(out)
}

fn note_dns_error<E: std::fmt::Display>(e: E) -> E {
    debug!(error = %e, "DNS lookup failed");
    threads::set_last_error(-1);
    e
}

fn answers_value(ctx: &Arc<ScriptContext>, answers: Option<Vec<Answer>>) -> Value {
    let Some(answers) = answers else {
        return Value::Null;
    };
    let items: Vec<Value> = answers
        .into_iter()
        .map(|a| match a {
            Answer::Text(t) => Value::Str(t),
            Answer::Srv { priority, weight, port, target } => {
                let o = ctx.make_object();
                o.set("priority", Value::Int(priority as i64));
                o.set("weight", Value::Int(weight as i64));
                o.set("port", Value::Int(port as i64));
                o.set("name", Value::Str(target));
                Value::Object(o)
            }
            Answer::Naptr { order, pref, flags, service, regexp, repl } => {
                let o = ctx.make_object();
                o.set("order", Value::Int(order as i64));
                o.set("preference", Value::Int(pref as i64));
                o.set("flags", Value::Str(flags));
                o.set("service", Value::Str(service));
                o.set("regexp", Value::Str(regexp));
                o.set("replacement", Value::Str(repl));
                Value::Object(o)
            }
        })
        .collect();
    Value::Object(ctx.array_from(items))
}

fn query_outcome(
    ctx: &Arc<ScriptContext>,
    qtype: String,
    name: String,
    asynchronous: bool,
) -> NativeOutcome {
    if asynchronous {
        let ctx = Arc::clone(ctx);
        NativeOutcome::Suspend(WorkItem::new(move || {
            answers_value(&ctx, resolve(&qtype, &name))
        }))
    } else {
        NativeOutcome::Ret(answers_value(ctx, resolve(&qtype, &name)))
    }
}

pub fn install_dns(ctx: &Arc<ScriptContext>) {
    let dns = ctx.make_object_at(ObjKind::Native("DNS"), 0, "native:DNS");

    dns.set(
        "query",
        native_fn("query", |r, _this, args| {
            let Some(qtype) = arg_str(&args, 0).map(|t| t.to_ascii_uppercase()) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let Some(name) = arg_str(&args, 1) else {
                return NativeOutcome::Ret(Value::Null);
            };
            let asynchronous = arg_bool(&args, 2, false);
            query_outcome(r.context(), qtype, name, asynchronous)
        }),
    );

    for (method, qtype) in [
        ("queryA", "A"),
        ("queryAaaa", "AAAA"),
        ("querySrv", "SRV"),
        ("queryTxt", "TXT"),
        ("queryNaptr", "NAPTR"),
    ] {
        dns.set(
            method,
            native_fn(method, move |r, _this, args| {
                let Some(name) = arg_str(&args, 0) else {
                    return NativeOutcome::Ret(Value::Null);
                };
                let asynchronous = arg_bool(&args, 1, false);
                query_outcome(r.context(), qtype.to_string(), name, asynchronous)
            }),
        );
    }

    dns.freeze();
    ctx.set_global("DNS", Value::Object(dns));
}

#[cfg(test)]
#[path = "dns_tests.rs"]
mod tests;
