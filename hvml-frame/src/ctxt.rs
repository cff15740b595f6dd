//! The per-handler scratch context (§3 "a per-handler scratch context with
//! its destructor").
//!
//! PurC stores this as a `void *` plus a function pointer that frees it;
//! here it's a plain sum type with one variant per element kind (the
//! REDESIGN FLAG's call). Dropping a [`Frame`](crate::Frame) drops its
//! `ElementCtxt` automatically — there is no destructor to remember to
//! call.

use crate::kinds::document::DocumentCtxt;
use crate::kinds::generic::GenericCtxt;
use crate::kinds::r#match::MatchCtxt;

pub enum ElementCtxt {
    /// No scratch state needed, or not yet populated.
    None,
    Document(DocumentCtxt),
    Match(MatchCtxt),
    Generic(GenericCtxt),
}

impl ElementCtxt {
    pub fn as_match(&mut self) -> Option<&mut MatchCtxt> {
        match self {
            ElementCtxt::Match(ctxt) => Some(ctxt),
            _ => None,
        }
    }

    pub fn as_document(&mut self) -> Option<&mut DocumentCtxt> {
        match self {
            ElementCtxt::Document(ctxt) => Some(ctxt),
            _ => None,
        }
    }

    pub fn as_generic(&mut self) -> Option<&mut GenericCtxt> {
        match self {
            ElementCtxt::Generic(ctxt) => Some(ctxt),
            _ => None,
        }
    }
}
