//! Chain of AST nodes enclosing a position.

use super::ast::*;
use crate::base::{Position, Span};

/// A node reference inside an [`AstPath`].
#[derive(Debug, Clone, Copy)]
pub enum AstNode<'a> {
    Declaration(&'a Declaration),
    ClassSpecifier(&'a ClassSpecifier),
    EnumSpecifier(&'a EnumSpecifier),
    TypeSpecifier(&'a TypeSpecifier),
    Declarator(&'a Declarator),
    FunctionDeclarator(&'a FunctionDeclarator),
    Parameter(&'a ParameterDeclaration),
    Statement(&'a Statement),
    Expression(&'a Expression),
    Name(&'a QualifiedName),
}

impl AstNode<'_> {
    pub fn span(&self) -> Span {
        match self {
            AstNode::Declaration(d) => d.span(),
            AstNode::ClassSpecifier(c) => c.span,
            AstNode::EnumSpecifier(e) => e.span,
            AstNode::TypeSpecifier(t) => t.span(),
            AstNode::Declarator(d) => d.span,
            AstNode::FunctionDeclarator(f) => f.span,
            AstNode::Parameter(p) => p.span,
            AstNode::Statement(s) => s.span(),
            AstNode::Expression(e) => e.span(),
            AstNode::Name(n) => n.span,
        }
    }
}

/// Nodes from the root to the innermost node containing a position.
///
/// The end of a node counts as inside, so a cursor placed right after an
/// identifier still finds it. The path may be empty and may stop at any depth;
/// callers must check lengths before indexing.
#[derive(Debug, Clone, Default)]
pub struct AstPath<'a> {
    nodes: Vec<AstNode<'a>>,
}

impl<'a> AstPath<'a> {
    pub fn at(unit: &'a TranslationUnit, position: Position) -> Self {
        let mut builder = PathBuilder {
            position,
            nodes: Vec::new(),
        };
        builder.declarations(&unit.declarations);
        AstPath {
            nodes: builder.nodes,
        }
    }

    pub fn nodes(&self) -> &[AstNode<'a>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<AstNode<'a>> {
        self.nodes.get(index).copied()
    }

    pub fn last(&self) -> Option<AstNode<'a>> {
        self.nodes.last().copied()
    }
}

struct PathBuilder<'a> {
    position: Position,
    nodes: Vec<AstNode<'a>>,
}

impl<'a> PathBuilder<'a> {
    fn hit(&self, span: Span) -> bool {
        span.contains_inclusive(self.position)
    }

    fn declarations(&mut self, declarations: &'a [Declaration]) -> bool {
        declarations.iter().any(|d| self.declaration(d))
    }

    fn declaration(&mut self, declaration: &'a Declaration) -> bool {
        if !self.hit(declaration.span()) {
            return false;
        }
        self.nodes.push(AstNode::Declaration(declaration));
        match declaration {
            Declaration::Simple(simple) => {
                let _ = self.specifiers(&simple.specifiers)
                    || simple.declarators.iter().any(|init| {
                        self.declarator(&init.declarator)
                            || match &init.initializer {
                                Some(Initializer::Assign(e)) => self.expression(e),
                                Some(Initializer::Braced(es)) | Some(Initializer::Call(es)) => {
                                    self.expressions(es)
                                }
                                None => false,
                            }
                    });
            }
            Declaration::Function(function) => {
                let _ = self.specifiers(&function.specifiers)
                    || self.declarator(&function.declarator)
                    || function.ctor_initializers.iter().any(|init| {
                        self.name(&init.name) || self.expressions(&init.args)
                    })
                    || self.compound(&function.body);
            }
            Declaration::Namespace(namespace) => {
                self.declarations(&namespace.members);
            }
            Declaration::Template(template) => {
                self.declaration(&template.declaration);
            }
            Declaration::Linkage { members, .. } => {
                self.declarations(members);
            }
            Declaration::UsingDirective { name, .. } | Declaration::Using { name, .. } => {
                self.name(name);
            }
            Declaration::Alias { type_id, .. } => {
                self.type_id(type_id);
            }
            Declaration::Access { .. } | Declaration::Empty(_) | Declaration::Error(_) => {}
        }
        true
    }

    fn specifiers(&mut self, specifiers: &'a DeclSpecifiers) -> bool {
        let Some(type_spec) = &specifiers.type_spec else {
            return false;
        };
        if !self.hit(type_spec.span()) {
            return false;
        }
        match type_spec {
            TypeSpecifier::Class(class) => {
                self.nodes.push(AstNode::ClassSpecifier(class));
                let _ = class.name.as_ref().is_some_and(|n| self.name(n))
                    || class.bases.iter().any(|b| self.name(&b.name))
                    || self.declarations(&class.members);
            }
            TypeSpecifier::Enum(e) => {
                self.nodes.push(AstNode::EnumSpecifier(e));
                for enumerator in &e.enumerators {
                    if let Some(value) = &enumerator.value {
                        if self.expression(value) {
                            break;
                        }
                    }
                }
            }
            TypeSpecifier::Named(name) | TypeSpecifier::Elaborated { name, .. } => {
                self.nodes.push(AstNode::TypeSpecifier(type_spec));
                self.name(name);
            }
            TypeSpecifier::Builtin { .. } => self.nodes.push(AstNode::TypeSpecifier(type_spec)),
        }
        true
    }

    fn declarator(&mut self, declarator: &'a Declarator) -> bool {
        if !self.hit(declarator.span) {
            return false;
        }
        self.nodes.push(AstNode::Declarator(declarator));
        if declarator.name.as_ref().is_some_and(|n| self.name(n)) {
            return true;
        }
        if let Some(function) = &declarator.function {
            if self.hit(function.span) {
                self.nodes.push(AstNode::FunctionDeclarator(function));
                for param in &function.params {
                    if self.hit(param.span) {
                        self.nodes.push(AstNode::Parameter(param));
                        let _ = self.specifiers(&param.specifiers)
                            || self.declarator(&param.declarator)
                            || param.default_value.as_ref().is_some_and(|e| self.expression(e));
                        break;
                    }
                }
            }
        }
        true
    }

    fn type_id(&mut self, type_id: &'a TypeId) -> bool {
        self.specifiers(&type_id.specifiers) || self.declarator(&type_id.declarator)
    }

    fn name(&mut self, name: &'a QualifiedName) -> bool {
        if !self.hit(name.span) {
            return false;
        }
        self.nodes.push(AstNode::Name(name));
        true
    }

    fn compound(&mut self, compound: &'a CompoundStatement) -> bool {
        compound.statements.iter().any(|s| self.statement(s))
    }

    fn condition(&mut self, condition: &'a Condition) -> bool {
        match condition {
            Condition::Expression(e) => self.expression(e),
            Condition::Declaration(simple) => {
                self.specifiers(&simple.specifiers)
                    || simple.declarators.iter().any(|d| self.declarator(&d.declarator))
            }
        }
    }

    fn statement(&mut self, statement: &'a Statement) -> bool {
        if !self.hit(statement.span()) {
            return false;
        }
        self.nodes.push(AstNode::Statement(statement));
        match statement {
            Statement::Compound(compound) => {
                self.compound(compound);
            }
            Statement::Declaration(declaration) => {
                self.declaration(declaration);
            }
            Statement::Expression { expression, .. } => {
                self.expression(expression);
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let _ = self.condition(condition)
                    || self.statement(then_branch)
                    || else_branch.as_ref().is_some_and(|e| self.statement(e));
            }
            Statement::While { condition, body, .. } | Statement::Switch { condition, body, .. } => {
                let _ = self.condition(condition) || self.statement(body);
            }
            Statement::Do { body, condition, .. } => {
                let _ = self.statement(body) || self.expression(condition);
            }
            Statement::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                let _ = init.as_ref().is_some_and(|s| self.statement(s))
                    || condition.as_ref().is_some_and(|c| self.condition(c))
                    || step.as_ref().is_some_and(|e| self.expression(e))
                    || self.statement(body);
            }
            Statement::ForRange {
                declaration,
                range,
                body,
                ..
            } => {
                let _ = self.specifiers(&declaration.specifiers)
                    || declaration
                        .declarators
                        .iter()
                        .any(|d| self.declarator(&d.declarator))
                    || self.expression(range)
                    || self.statement(body);
            }
            Statement::Case { value, .. } | Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.expression(value);
                }
            }
            Statement::Break(_)
            | Statement::Continue(_)
            | Statement::Empty(_)
            | Statement::Error(_) => {}
        }
        true
    }

    fn expressions(&mut self, expressions: &'a [Expression]) -> bool {
        expressions.iter().any(|e| self.expression(e))
    }

    fn expression(&mut self, expression: &'a Expression) -> bool {
        if !self.hit(expression.span()) {
            return false;
        }
        self.nodes.push(AstNode::Expression(expression));
        match expression {
            Expression::Name(name) => {
                self.name(name);
            }
            Expression::Member { base, member, .. } => {
                let _ = self.expression(base) || self.name(member);
            }
            Expression::Call { callee, args, .. } => {
                let _ = self.expression(callee) || self.expressions(args);
            }
            Expression::Subscript { base, index, .. } => {
                let _ = self.expression(base) || self.expression(index);
            }
            Expression::Unary { operand, .. } | Expression::Delete { operand, .. } => {
                self.expression(operand);
            }
            Expression::Binary { lhs, rhs, .. } => {
                let _ = self.expression(lhs) || self.expression(rhs);
            }
            Expression::Conditional {
                condition,
                then_value,
                else_value,
                ..
            } => {
                let _ = self.expression(condition)
                    || self.expression(then_value)
                    || self.expression(else_value);
            }
            Expression::Cast {
                type_id, operand, ..
            } => {
                let _ = self.type_id(type_id) || self.expression(operand);
            }
            Expression::SizeofType { type_id, .. } => {
                self.type_id(type_id);
            }
            Expression::New { type_id, args, .. } => {
                let _ = self.type_id(type_id) || self.expressions(args);
            }
            Expression::Lambda(lambda) => {
                let _ = lambda.params.iter().any(|p| {
                    self.hit(p.span) && {
                        self.nodes.push(AstNode::Parameter(p));
                        let _ = self.specifiers(&p.specifiers) || self.declarator(&p.declarator);
                        true
                    }
                }) || self.compound(&lambda.body);
            }
            Expression::Braced { elements, .. } => {
                self.expressions(elements);
            }
            Expression::Literal { .. }
            | Expression::This(_)
            | Expression::QtMethod { .. }
            | Expression::Error(_) => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FilePath;
    use crate::parser::{parse_translation_unit, read_tokens};

    fn unit(source: &str) -> TranslationUnit {
        parse_translation_unit(&read_tokens(source), &FilePath::new("/p.cpp")).0
    }

    #[test]
    fn test_path_into_declarator_name() {
        let unit = unit("void Foo::bar(int x)\n{\n    x = 2;\n}");
        let path = AstPath::at(&unit, Position::new(1, 11));
        assert!(matches!(path.get(0), Some(AstNode::Declaration(Declaration::Function(_)))));
        assert!(matches!(path.get(1), Some(AstNode::Declarator(_))));
        assert!(matches!(path.last(), Some(AstNode::Name(_))));
    }

    #[test]
    fn test_path_into_parameter() {
        let unit = unit("void bar(int x);");
        let path = AstPath::at(&unit, Position::new(1, 14));
        assert!(path.nodes().iter().any(|n| matches!(n, AstNode::Parameter(_))));
    }

    #[test]
    fn test_path_into_body() {
        let unit = unit("void bar()\n{\n    value = 2;\n}");
        let path = AstPath::at(&unit, Position::new(3, 6));
        assert!(matches!(path.get(1), Some(AstNode::Statement(_))));
        assert!(matches!(path.last(), Some(AstNode::Name(_))));
    }

    #[test]
    fn test_empty_path_outside_any_node() {
        let unit = unit("int a;\n\n\nint b;");
        assert!(AstPath::at(&unit, Position::new(2, 1)).is_empty());
    }
}
