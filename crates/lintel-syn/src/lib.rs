//! # lintel-syn
//!
//! Rust front end for lintel: parses source files with `syn` and lowers them
//! into the language-neutral [`SyntaxTree`] the engine analyzes.
//!
//! | Rust syntax | Node kind |
//! |-------------|-----------|
//! | `struct`, `enum`, `union`, `trait`, `impl` | [`NodeKind::Class`] |
//! | `fn` items, methods, trait methods | [`NodeKind::Function`] |
//! | function arguments | [`NodeKind::Parameter`] |
//! | fields, `const`, `static`, `let` | [`NodeKind::Property`] |
//! | `mod` | [`NodeKind::Module`] |
//! | `use` | [`NodeKind::Import`] |
//! | calls, method calls, macro invocations | [`NodeKind::Call`] |
//! | `{ ... }` blocks | [`NodeKind::Block`] |
//! | `match` | [`NodeKind::Expression`] |
//!
//! Outer attributes become annotations of the node they decorate, inner
//! attributes of the file become annotations of the root. `cfg_attr`
//! wrappers are unwrapped, so `#[cfg_attr(lintel, suppress("LongMethod"))]`
//! suppresses like `#[suppress("LongMethod")]`. Doc comments are dropped.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use lintel_core::{Annotation, NodeKind, NodeSpec, Span, SyntaxTree, TreeBuilder};
use proc_macro2::{LineColumn, TokenStream, TokenTree};
use quote::ToTokens;
use std::path::{Path, PathBuf};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::{Attribute, Expr, FnArg, Meta, Pat, Signature, Token};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a Rust source file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid Rust.
    #[error("Parse error in {path}:{line}:{column}: {message}")]
    Syntax {
        /// File that failed.
        path: PathBuf,
        /// Line of the error (1-indexed).
        line: usize,
        /// Column of the error (1-indexed).
        column: usize,
        /// Parser message.
        message: String,
    },
}

/// Reads and parses a Rust source file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn parse_path(path: &Path) -> Result<SyntaxTree, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_file(path, content)
}

/// Parses Rust source text into a [`SyntaxTree`] rooted at `path`.
///
/// # Errors
///
/// Returns [`ParseError::Syntax`] if `content` is not a valid Rust file.
pub fn parse_file(
    path: impl Into<PathBuf>,
    content: impl Into<String>,
) -> Result<SyntaxTree, ParseError> {
    let path = path.into();
    let content = content.into();
    debug!("Parsing: {}", path.display());

    let file = syn::parse_file(&content).map_err(|e| {
        let start = e.span().start();
        ParseError::Syntax {
            path: path.clone(),
            line: start.line,
            column: start.column + 1,
            message: e.to_string(),
        }
    })?;

    let mut lowering = Lowering::new(TreeBuilder::new(path, content));
    lowering.visit_file(&file);
    Ok(lowering.builder.build())
}

struct Lowering {
    builder: TreeBuilder,
    line_starts: Vec<usize>,
}

impl Lowering {
    fn new(builder: TreeBuilder) -> Self {
        let line_starts = std::iter::once(0)
            .chain(builder.content().match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            builder,
            line_starts,
        }
    }

    /// Byte offset of a proc-macro2 position (1-indexed line, char column).
    fn offset(&self, at: LineColumn) -> usize {
        let content = self.builder.content();
        let Some(&start) = self.line_starts.get(at.line.saturating_sub(1)) else {
            return content.len();
        };
        content[start..]
            .char_indices()
            .nth(at.column)
            .map_or(content.len(), |(i, _)| start + i)
    }

    fn spec(&self, kind: NodeKind, start: proc_macro2::Span, end: proc_macro2::Span) -> NodeSpec {
        let from = start.start();
        let to = end.end();
        NodeSpec::new(
            kind,
            Span::new(from.line, from.column + 1, self.offset(from), self.offset(to)),
        )
    }

    fn source(&self, span: proc_macro2::Span) -> String {
        let start = self.offset(span.start());
        let end = self.offset(span.end());
        let text = self.builder.content().get(start..end).unwrap_or_default();
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn signature(&self, sig: &Signature) -> String {
        self.source(sig.span())
    }

    fn nested(&mut self, spec: NodeSpec, visit: impl FnOnce(&mut Self)) {
        self.builder.open(spec);
        visit(self);
        self.builder.close();
    }
}

impl<'ast> Visit<'ast> for Lowering {
    fn visit_file(&mut self, file: &'ast syn::File) {
        for annotation in annotations(&file.attrs) {
            self.builder.annotate_root(annotation);
        }
        for item in &file.items {
            self.visit_item(item);
        }
    }

    fn visit_attribute(&mut self, _attr: &'ast Attribute) {}

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        let spec = self
            .spec(NodeKind::Function, node.sig.span(), node.span())
            .named(node.sig.ident.to_string())
            .with_signature(self.signature(&node.sig))
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_item_fn(this, node));
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        let spec = self
            .spec(NodeKind::Function, node.sig.span(), node.span())
            .named(node.sig.ident.to_string())
            .with_signature(self.signature(&node.sig))
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_impl_item_fn(this, node));
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        let spec = self
            .spec(NodeKind::Function, node.sig.span(), node.span())
            .named(node.sig.ident.to_string())
            .with_signature(self.signature(&node.sig))
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_trait_item_fn(this, node));
    }

    fn visit_fn_arg(&mut self, node: &'ast FnArg) {
        let name = match node {
            FnArg::Receiver(_) => "self".to_string(),
            FnArg::Typed(typed) => pattern_name(&typed.pat),
        };
        let attrs = match node {
            FnArg::Receiver(receiver) => &receiver.attrs,
            FnArg::Typed(typed) => &typed.attrs,
        };
        let spec = self
            .spec(NodeKind::Parameter, node.span(), node.span())
            .named(name)
            .with_annotations(annotations(attrs));
        self.nested(spec, |this| visit::visit_fn_arg(this, node));
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        let spec = self
            .spec(NodeKind::Class, node.struct_token.span, node.span())
            .named(node.ident.to_string())
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_item_struct(this, node));
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        let spec = self
            .spec(NodeKind::Class, node.enum_token.span, node.span())
            .named(node.ident.to_string())
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_item_enum(this, node));
    }

    fn visit_item_union(&mut self, node: &'ast syn::ItemUnion) {
        let spec = self
            .spec(NodeKind::Class, node.union_token.span, node.span())
            .named(node.ident.to_string())
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_item_union(this, node));
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        let spec = self
            .spec(NodeKind::Class, node.trait_token.span, node.span())
            .named(node.ident.to_string())
            .with_signature(format!("trait {}", node.ident))
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_item_trait(this, node));
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        let self_ty = compact(node.self_ty.to_token_stream());
        let signature = match &node.trait_ {
            Some((_, path, _)) => format!("impl {} for {self_ty}", compact(path.to_token_stream())),
            None => format!("impl {self_ty}"),
        };
        let spec = self
            .spec(NodeKind::Class, node.impl_token.span, node.span())
            .named(self_ty)
            .with_signature(signature)
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_item_impl(this, node));
    }

    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        let spec = self
            .spec(NodeKind::Module, node.mod_token.span, node.span())
            .named(node.ident.to_string())
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_item_mod(this, node));
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        let spec = self
            .spec(NodeKind::Import, node.use_token.span, node.span())
            .named(compact(node.tree.to_token_stream()))
            .with_annotations(annotations(&node.attrs));
        self.builder.leaf(spec);
    }

    fn visit_item_const(&mut self, node: &'ast syn::ItemConst) {
        let spec = self
            .spec(NodeKind::Property, node.const_token.span, node.span())
            .named(node.ident.to_string())
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_item_const(this, node));
    }

    fn visit_item_static(&mut self, node: &'ast syn::ItemStatic) {
        let spec = self
            .spec(NodeKind::Property, node.static_token.span, node.span())
            .named(node.ident.to_string())
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_item_static(this, node));
    }

    fn visit_field(&mut self, node: &'ast syn::Field) {
        let mut spec = self
            .spec(NodeKind::Property, node.span(), node.span())
            .with_annotations(annotations(&node.attrs));
        if let Some(ident) = &node.ident {
            spec = spec.named(ident.to_string());
        }
        self.nested(spec, |this| visit::visit_field(this, node));
    }

    fn visit_local(&mut self, node: &'ast syn::Local) {
        let spec = self
            .spec(NodeKind::Property, node.let_token.span, node.span())
            .named(pattern_name(&node.pat))
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_local(this, node));
    }

    fn visit_block(&mut self, node: &'ast syn::Block) {
        let spec = self.spec(
            NodeKind::Block,
            node.brace_token.span.open(),
            node.brace_token.span.close(),
        );
        self.nested(spec, |this| visit::visit_block(this, node));
    }

    fn visit_expr_call(&mut self, node: &'ast syn::ExprCall) {
        let mut spec = self
            .spec(NodeKind::Call, node.span(), node.span())
            .with_annotations(annotations(&node.attrs));
        if let Expr::Path(callee) = node.func.as_ref() {
            if let Some(last) = callee.path.segments.last() {
                spec = spec
                    .named(last.ident.to_string())
                    .with_signature(path_name(&callee.path));
            }
        }
        self.nested(spec, |this| visit::visit_expr_call(this, node));
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        let spec = self
            .spec(NodeKind::Call, node.span(), node.span())
            .named(node.method.to_string())
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_expr_method_call(this, node));
    }

    fn visit_macro(&mut self, node: &'ast syn::Macro) {
        let Some(last) = node.path.segments.last() else {
            return;
        };
        let spec = self
            .spec(NodeKind::Call, node.span(), node.span())
            .named(format!("{}!", last.ident))
            .with_signature(format!("{}!", path_name(&node.path)));
        self.builder.leaf(spec);
    }

    fn visit_expr_match(&mut self, node: &'ast syn::ExprMatch) {
        let spec = self
            .spec(NodeKind::Expression, node.match_token.span, node.span())
            .named("match")
            .with_annotations(annotations(&node.attrs));
        self.nested(spec, |this| visit::visit_expr_match(this, node));
    }
}

fn annotations(attrs: &[Attribute]) -> Vec<Annotation> {
    let mut collected = Vec::new();
    for attr in attrs {
        collect_meta(&attr.meta, &mut collected);
    }
    collected
}

fn collect_meta(meta: &Meta, collected: &mut Vec<Annotation>) {
    let path = meta.path();
    if path.is_ident("doc") {
        return;
    }
    if path.is_ident("cfg_attr") {
        if let Meta::List(list) = meta {
            if let Ok(nested) =
                list.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
            {
                // First entry is the predicate.
                for inner in nested.iter().skip(1) {
                    collect_meta(inner, collected);
                }
            }
        }
        return;
    }
    let arguments = match meta {
        Meta::Path(_) => Vec::new(),
        Meta::List(list) => split_arguments(list.tokens.clone()),
        Meta::NameValue(pair) => vec![argument(pair.value.to_token_stream())],
    };
    collected.push(Annotation::new(path_name(path), arguments));
}

fn split_arguments(tokens: TokenStream) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut current = TokenStream::new();
    for token in tokens {
        match token {
            TokenTree::Punct(ref punct) if punct.as_char() == ',' => {
                if !current.is_empty() {
                    arguments.push(argument(std::mem::take(&mut current)));
                }
            }
            other => current.extend(std::iter::once(other)),
        }
    }
    if !current.is_empty() {
        arguments.push(argument(current));
    }
    arguments
}

/// String literals yield their value, anything else its compacted tokens.
fn argument(tokens: TokenStream) -> String {
    match syn::parse2::<syn::LitStr>(tokens.clone()) {
        Ok(literal) => literal.value(),
        Err(_) => compact(tokens),
    }
}

fn compact(tokens: TokenStream) -> String {
    tokens.to_string().split_whitespace().collect()
}

fn path_name(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

fn pattern_name(pat: &Pat) -> String {
    match pat {
        Pat::Ident(ident) => ident.ident.to_string(),
        Pat::Type(typed) => pattern_name(&typed.pat),
        Pat::Reference(reference) => pattern_name(&reference.pat),
        other => compact(other.to_token_stream()),
    }
}
