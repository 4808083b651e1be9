//! Human-readable type rendering for diagnostics and logging.
//!
//! Renders in source-like notation: `Map<K, out V>?`, `*` for star
//! projections. Declarations missing from the environment render their raw
//! id so debug output stays usable on partially-built graphs.

use crate::{Type, TypeEnv, TypeProjection};

pub fn format_type(env: &dyn TypeEnv, ty: &Type) -> String {
    let mut out = String::new();
    push_type(env, ty, &mut out);
    out
}

pub fn format_projection(env: &dyn TypeEnv, projection: &TypeProjection) -> String {
    let mut out = String::new();
    push_projection(env, projection, &mut out);
    out
}

fn push_type(env: &dyn TypeEnv, ty: &Type, out: &mut String) {
    match ty {
        Type::Class(ct) => {
            match env.class(ct.def) {
                Some(class) => out.push_str(&class.name),
                None => out.push_str(&format!("{:?}", ct.def)),
            }
            if !ct.args.is_empty() {
                out.push('<');
                for (idx, arg) in ct.args.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    push_projection(env, arg, out);
                }
                out.push('>');
            }
            if ct.nullable {
                out.push('?');
            }
        }
        Type::TypeVar(var) => {
            match env.type_param(var.id) {
                Some(param) => out.push_str(&param.name),
                None => out.push_str(&format!("{:?}", var.id)),
            }
            if var.nullable {
                out.push('?');
            }
        }
    }
}

fn push_projection(env: &dyn TypeEnv, projection: &TypeProjection, out: &mut String) {
    match projection {
        TypeProjection::Star => out.push('*'),
        TypeProjection::Arg { variance, ty } => {
            out.push_str(variance.label());
            push_type(env, ty, out);
        }
    }
}
