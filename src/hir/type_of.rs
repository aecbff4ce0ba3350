//! Typing of id-expressions, member accesses and call chains.

use smol_str::SmolStr;

use super::bind::type_id_type;
use super::document::SymbolRef;
use super::lookup::{Binding, LookupContext, LookupItem, ScopeRef};
use super::symbols::{FullType, SymbolKind};
use super::walk::{NameOccurrence, NameRole};
use crate::base::Position;
use crate::parser::TokenKind;
use crate::parser::ast::Expression;

const MAX_EXPRESSION_DEPTH: usize = 32;

/// Resolves expressions to candidate declarations and types.
pub struct TypeOfExpression<'a> {
    context: &'a LookupContext,
}

impl<'a> TypeOfExpression<'a> {
    pub fn new(context: &'a LookupContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &'a LookupContext {
        self.context
    }

    /// Candidates for `expression` evaluated in `from` at `position`.
    pub fn resolve(&self, expression: &Expression, from: &ScopeRef, position: Position) -> Vec<LookupItem> {
        self.items(expression, from, position, 0)
    }

    /// Declarations a name occurrence of the context's document refers to.
    pub fn resolve_occurrence(&self, occurrence: &NameOccurrence<'_>) -> Vec<SymbolRef> {
        let context = self.context;
        let document = context.document();
        let segment = occurrence.segment();
        let position = segment.span.start;
        let from = context.scope_at(position);
        let path: Vec<SmolStr> = occurrence.name[..=occurrence.index]
            .iter()
            .map(|s| s.text.clone())
            .collect();

        if occurrence.is_qualifier() {
            return context
                .resolve_qualifier(&path, occurrence.global, &from, position)
                .and_then(|binding| self.binding_symbol(&binding))
                .into_iter()
                .collect();
        }
        match occurrence.role {
            NameRole::Declaration => document
                .symbol_declared_at(position.line, position.column)
                .filter(|id| document.symbol(*id).name() == Some(segment.text.as_str()))
                .map(|id| vec![SymbolRef::new(document.clone(), id)])
                .unwrap_or_default(),
            NameRole::Type | NameRole::Expression | NameRole::MemberInitializer => {
                context.lookup_path(&path, occurrence.global, &from, position)
            }
            NameRole::Member(base) => {
                let mut found: Vec<SymbolRef> = Vec::new();
                for item in self.resolve(base, &from, base.span().start) {
                    let Some(binding) = self.binding_for_item(&item) else { continue };
                    for member in context.members(&binding, &segment.text) {
                        if !found.contains(&member) {
                            found.push(member);
                        }
                    }
                }
                found
            }
        }
    }

    /// The class or namespace an item's members live in.
    pub fn binding_for_item(&self, item: &LookupItem) -> Option<Binding> {
        match &item.declaration {
            Some(declaration) if declaration.kind().is_type_like() => {
                self.context.binding_of(declaration)
            }
            _ => self.context.type_binding(&item.ty, &item.scope, item.position),
        }
    }

    /// A symbol standing for a binding; namespaces use their first opening.
    fn binding_symbol(&self, binding: &Binding) -> Option<SymbolRef> {
        match binding {
            Binding::Class(symbol) | Binding::Enum(symbol) => Some(symbol.clone()),
            Binding::Namespace(path) => {
                let (last, _) = path.split_last()?;
                self.context.visible_documents().iter().find_map(|document| {
                    document
                        .symbols()
                        .symbols()
                        .find(|(_, s)| {
                            s.kind == SymbolKind::Namespace
                                && s.name() == Some(last.as_str())
                                && s.members.is_some_and(|m| {
                                    document.symbols().namespace_path(m) == *path
                                })
                        })
                        .map(|(id, _)| SymbolRef::new(document.clone(), id))
                })
            }
        }
    }

    fn items(&self, expression: &Expression, from: &ScopeRef, position: Position, depth: usize) -> Vec<LookupItem> {
        if depth > MAX_EXPRESSION_DEPTH {
            return Vec::new();
        }
        match expression {
            Expression::Name(name) => self
                .context
                .lookup(name, from, position)
                .into_iter()
                .map(LookupItem::of_symbol)
                .collect(),
            Expression::This(_) => match self.context.enclosing_class(from) {
                Some(class) => {
                    let mut item = LookupItem::of_symbol(class);
                    item.ty.pointer_depth = 1;
                    vec![item]
                }
                None => Vec::new(),
            },
            Expression::Member { base, member, .. } => {
                let mut out: Vec<LookupItem> = Vec::new();
                for item in self.items(base, from, position, depth + 1) {
                    let Some(binding) = self.binding_for_item(&item) else { continue };
                    for symbol in self.context.members(&binding, &member.last().text) {
                        if !out.iter().any(|o| o.declaration.as_ref() == Some(&symbol)) {
                            out.push(LookupItem::of_symbol(symbol));
                        }
                    }
                }
                out
            }
            Expression::Call { callee, args, .. } => {
                let candidates = self.items(callee, from, position, depth + 1);
                let matching: Vec<LookupItem> = candidates
                    .iter()
                    .filter(|item| {
                        item.ty
                            .function
                            .as_ref()
                            .is_some_and(|f| f.accepts_arity(args.len()))
                    })
                    .cloned()
                    .collect();
                let chosen = if matching.is_empty() { candidates } else { matching };
                chosen
                    .into_iter()
                    .map(|mut item| {
                        item.ty = item.ty.return_type();
                        item
                    })
                    .collect()
            }
            Expression::Subscript { base, .. } => self
                .items(base, from, position, depth + 1)
                .into_iter()
                .map(|mut item| {
                    item.ty.pointer_depth = item.ty.pointer_depth.saturating_sub(1);
                    item
                })
                .collect(),
            Expression::Unary { op, operand, .. } => {
                let items = self.items(operand, from, position, depth + 1);
                match op {
                    TokenKind::Star => items
                        .into_iter()
                        .map(|mut item| {
                            item.ty.pointer_depth = item.ty.pointer_depth.saturating_sub(1);
                            item
                        })
                        .collect(),
                    TokenKind::Amp => items
                        .into_iter()
                        .map(|mut item| {
                            item.ty.pointer_depth = item.ty.pointer_depth.saturating_add(1);
                            item
                        })
                        .collect(),
                    _ => items,
                }
            }
            Expression::Binary { op, lhs, rhs, .. } => {
                if *op == TokenKind::Comma {
                    self.items(rhs, from, position, depth + 1)
                } else {
                    self.items(lhs, from, position, depth + 1)
                }
            }
            Expression::Conditional { then_value, .. } => self.items(then_value, from, position, depth + 1),
            Expression::Cast { type_id, .. } => vec![self.type_item(type_id_type(type_id), from, position)],
            Expression::New { type_id, .. } => {
                let mut ty = type_id_type(type_id);
                ty.pointer_depth = ty.pointer_depth.saturating_add(1);
                vec![self.type_item(ty, from, position)]
            }
            Expression::Literal { .. }
            | Expression::SizeofType { .. }
            | Expression::Delete { .. }
            | Expression::Lambda(_)
            | Expression::Braced { .. }
            | Expression::QtMethod { .. }
            | Expression::Error(_) => Vec::new(),
        }
    }

    fn type_item(&self, ty: FullType, from: &ScopeRef, position: Position) -> LookupItem {
        LookupItem {
            declaration: None,
            ty,
            scope: from.clone(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::base::FilePath;
    use crate::hir::{Document, Snapshot};
    use crate::parser::parse_expression;

    fn context(source: &str) -> LookupContext {
        let path = FilePath::new("/p/a.cpp");
        let snapshot = Snapshot::default();
        let pp = snapshot.preprocessed_code(source, &path, &[]);
        let document = Arc::new(Document::from_source(pp, 1));
        let snapshot = snapshot.insert(document.clone());
        LookupContext::new(document, &snapshot)
    }

    fn resolve(ctx: &LookupContext, text: &str, line: u32, column: u32) -> Vec<LookupItem> {
        let position = Position::new(line, column);
        let expression = parse_expression(text, position).unwrap();
        TypeOfExpression::new(ctx).resolve(&expression, &ctx.scope_at(position), position)
    }

    const SOURCE: &str = "\
struct Point { int x; int length() const; };
struct Shape {
    Point *origin;
    Point center(int a, int b = 0);
    Point center(double a, double b, double c);
    void draw();
};
void Shape::draw()
{
    origin->x;
}
";

    #[test]
    fn test_member_access_through_pointer_field() {
        let ctx = context(SOURCE);
        let items = resolve(&ctx, "origin->x", 10, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].declaration.as_ref().unwrap().qualified_name(), vec!["Point", "x"]);
    }

    #[test]
    fn test_call_filters_by_arity_and_returns_result_type() {
        let ctx = context(SOURCE);
        let items = resolve(&ctx, "center(1, 2, 3)", 10, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].declaration.as_ref().unwrap().line(), 5);
        let chained = resolve(&ctx, "center(1).length()", 10, 5);
        assert_eq!(chained[0].declaration.as_ref().unwrap().name(), Some("length"));
    }

    #[test]
    fn test_this_is_enclosing_class() {
        let ctx = context(SOURCE);
        let items = resolve(&ctx, "this->origin", 10, 5);
        assert_eq!(items[0].declaration.as_ref().unwrap().line(), 3);
    }
}
