//! Builds a [`SymbolTable`] from a parsed translation unit.

use smol_str::SmolStr;

use super::symbols::{FullType, FunctionType, ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::base::Span;
use crate::parser::ast::{
    Access, ClassSpecifier, CompoundStatement, Condition, Declaration, DeclSpecifiers, Declarator,
    EnumSpecifier, Expression, FunctionDefinition, Initializer, LambdaExpression, NameSegment,
    ParameterDeclaration, PtrOperator, SimpleDeclaration, Statement, TemplateArgument,
    TemplateDeclaration, TemplateParameterKind, TranslationUnit, TypeId, TypeSpecifier,
};

/// Declare every entity of `unit`.
pub fn bind(unit: &TranslationUnit) -> SymbolTable {
    let mut binder = Binder {
        table: SymbolTable::new(),
    };
    let mut access = Access::Public;
    for declaration in &unit.declarations {
        binder.declaration(declaration, ScopeId::GLOBAL, None, &mut access);
    }
    binder.table
}

// ============================================================================
// Types
// ============================================================================

fn base_type(specifiers: &DeclSpecifiers) -> FullType {
    let (name, builtin) = match &specifiers.type_spec {
        Some(TypeSpecifier::Builtin { text, .. }) => (vec![text.clone()], true),
        Some(TypeSpecifier::Named(name)) | Some(TypeSpecifier::Elaborated { name, .. }) => {
            (name.path(), false)
        }
        Some(TypeSpecifier::Class(class)) => (
            class.name.as_ref().map(|n| n.path()).unwrap_or_default(),
            false,
        ),
        Some(TypeSpecifier::Enum(e)) => (
            e.name.iter().map(|n| n.text.clone()).collect(),
            false,
        ),
        None => (Vec::new(), false),
    };
    FullType {
        name,
        builtin,
        is_const: specifiers.is_const,
        ..FullType::default()
    }
}

fn apply_ptr_ops(ty: &mut FullType, ptr_ops: &[PtrOperator]) {
    for op in ptr_ops {
        match op {
            PtrOperator::Pointer { .. } => ty.pointer_depth = ty.pointer_depth.saturating_add(1),
            PtrOperator::Reference | PtrOperator::RValueReference => ty.is_reference = true,
        }
    }
}

/// Declared type of `declarator` under `specifiers`.
pub(crate) fn declared_type(specifiers: &DeclSpecifiers, declarator: &Declarator) -> FullType {
    let mut ty = base_type(specifiers);
    apply_ptr_ops(&mut ty, &declarator.ptr_ops);
    ty.pointer_depth = ty.pointer_depth.saturating_add(declarator.array_dims as u8);
    if let Some(function) = &declarator.function {
        if declarator.is_function_pointer {
            return ty;
        }
        if let Some(trailing) = &function.trailing_return {
            ty = type_id_type(trailing);
        }
        let arguments = function
            .params
            .iter()
            .map(|p| declared_type(&p.specifiers, &p.declarator))
            .collect();
        let required_arguments = function
            .params
            .iter()
            .position(|p| p.default_value.is_some())
            .unwrap_or(function.params.len());
        ty.function = Some(Box::new(FunctionType {
            arguments,
            required_arguments,
            variadic: function.variadic,
            is_const: function.is_const,
            is_virtual: specifiers.flags.is_virtual,
            is_pure: function.is_pure,
            is_override: function.is_override,
        }));
    }
    ty
}

pub(crate) fn type_id_type(type_id: &TypeId) -> FullType {
    declared_type(&type_id.specifiers, &type_id.declarator)
}

fn segment_texts(segments: &[NameSegment]) -> Vec<SmolStr> {
    segments.iter().map(|s| s.text.clone()).collect()
}

// ============================================================================
// Binder
// ============================================================================

struct Binder {
    table: SymbolTable,
}

impl Binder {
    /// `members_parent` is the template scope wrapping the declaration, if any.
    fn declaration(
        &mut self,
        declaration: &Declaration,
        scope: ScopeId,
        members_parent: Option<ScopeId>,
        access: &mut Access,
    ) {
        match declaration {
            Declaration::Simple(simple) => self.simple_declaration(simple, scope, members_parent, *access),
            Declaration::Function(function) => {
                self.function_definition(function, scope, members_parent, *access);
            }
            Declaration::Namespace(namespace) => {
                let span = namespace
                    .name
                    .as_ref()
                    .map(|n| n.span)
                    .unwrap_or(namespace.span);
                let mut symbol = Symbol::new(
                    namespace.name.as_ref().map(|n| n.text.clone()),
                    SymbolKind::Namespace,
                    scope,
                    span,
                );
                symbol.generated = namespace.name.as_ref().is_some_and(|n| n.generated);
                let id = self.table.add_symbol(symbol);
                let members = self
                    .table
                    .add_scope(ScopeKind::Namespace, scope, Some(id), namespace.body);
                self.table.set_members(id, members);
                let mut inner = Access::Public;
                for member in &namespace.members {
                    self.declaration(member, members, None, &mut inner);
                }
            }
            Declaration::Template(template) => self.template(template, scope, access),
            Declaration::Linkage { members, .. } => {
                for member in members {
                    self.declaration(member, scope, None, access);
                }
            }
            Declaration::UsingDirective { name, span } => {
                let mut symbol = Symbol::new(None, SymbolKind::UsingNamespace, scope, *span);
                symbol.references.push(name.path());
                self.table.add_symbol(symbol);
            }
            Declaration::Using { name, .. } => {
                let last = name.last();
                let mut symbol = Symbol::new(
                    Some(SmolStr::new(last.identifier())),
                    SymbolKind::UsingDeclaration,
                    scope,
                    last.span,
                );
                symbol.generated = last.generated;
                symbol.references.push(name.path());
                symbol.access = *access;
                self.table.add_symbol(symbol);
            }
            Declaration::Alias { name, type_id, .. } => {
                let mut symbol = Symbol::new(Some(name.text.clone()), SymbolKind::Typedef, scope, name.span);
                symbol.ty = type_id_type(type_id);
                symbol.generated = name.generated;
                symbol.access = *access;
                self.table.add_symbol(symbol);
                self.type_id(type_id, scope);
            }
            Declaration::Access { access: new, .. } => *access = *new,
            Declaration::Empty(_) | Declaration::Error(_) => {}
        }
    }

    fn template(&mut self, template: &TemplateDeclaration, scope: ScopeId, access: &mut Access) {
        let template_scope = self
            .table
            .add_scope(ScopeKind::Template, scope, None, template.span);
        for param in &template.params {
            let Some(name) = &param.name else { continue };
            let mut symbol = Symbol::new(
                Some(name.text.clone()),
                SymbolKind::TemplateParameter,
                template_scope,
                name.span,
            );
            if let TemplateParameterKind::Value(specifiers) = &param.kind {
                symbol.ty = base_type(specifiers);
            }
            symbol.generated = name.generated;
            self.table.add_symbol(symbol);
        }
        self.declaration(&template.declaration, scope, Some(template_scope), access);
    }

    fn simple_declaration(
        &mut self,
        simple: &SimpleDeclaration,
        scope: ScopeId,
        members_parent: Option<ScopeId>,
        access: Access,
    ) {
        let flags = simple.specifiers.flags;
        match &simple.specifiers.type_spec {
            Some(TypeSpecifier::Class(class)) => {
                self.class(class, scope, members_parent, access);
            }
            Some(TypeSpecifier::Enum(e)) => self.enumeration(e, scope, access),
            Some(TypeSpecifier::Elaborated {
                key: Some(_), name, ..
            }) if simple.declarators.is_empty() && !flags.is_friend => {
                let last = name.last();
                let mut symbol = Symbol::new(
                    Some(last.text.clone()),
                    SymbolKind::ForwardClass,
                    scope,
                    last.span,
                );
                symbol.qualifier = segment_texts(name.qualifier());
                symbol.generated = last.generated;
                symbol.access = access;
                self.table.add_symbol(symbol);
            }
            _ => {}
        }
        if flags.is_friend {
            return;
        }
        for init in &simple.declarators {
            let declarator = &init.declarator;
            self.declarator_expressions(declarator, scope);
            if let Some(initializer) = &init.initializer {
                self.initializer(initializer, scope);
            }
            let Some(name) = &declarator.name else { continue };
            let last = name.last();
            let kind = if flags.is_typedef {
                SymbolKind::Typedef
            } else {
                SymbolKind::Declaration
            };
            let mut symbol = Symbol::new(Some(last.text.clone()), kind, scope, last.span);
            symbol.ty = declared_type(&simple.specifiers, declarator);
            symbol.qualifier = segment_texts(name.qualifier());
            symbol.generated = last.generated;
            symbol.is_static = flags.is_static;
            symbol.access = access;
            self.table.add_symbol(symbol);
        }
    }

    fn class(
        &mut self,
        class: &ClassSpecifier,
        scope: ScopeId,
        members_parent: Option<ScopeId>,
        access: Access,
    ) -> SymbolId {
        let (name, qualifier, span, generated) = match &class.name {
            Some(name) => {
                let last = name.last();
                (
                    Some(last.text.clone()),
                    segment_texts(name.qualifier()),
                    last.span,
                    last.generated,
                )
            }
            None => (None, Vec::new(), Span::new(class.span.start, class.span.start), false),
        };
        let mut symbol = Symbol::new(name, SymbolKind::Class, scope, span);
        symbol.qualifier = qualifier;
        symbol.generated = generated;
        symbol.access = access;
        symbol.references = class.bases.iter().map(|b| b.name.path()).collect();
        let id = self.table.add_symbol(symbol);
        let members = self.table.add_scope(
            ScopeKind::Class,
            members_parent.unwrap_or(scope),
            Some(id),
            class.body,
        );
        self.table.set_members(id, members);
        let mut member_access = match class.key {
            crate::parser::ast::ClassKey::Class => Access::Private,
            _ => Access::Public,
        };
        for member in &class.members {
            self.declaration(member, members, None, &mut member_access);
        }
        id
    }

    fn enumeration(&mut self, e: &EnumSpecifier, scope: ScopeId, access: Access) {
        let span = e
            .name
            .as_ref()
            .map(|n| n.span)
            .unwrap_or(Span::new(e.span.start, e.span.start));
        let mut symbol = Symbol::new(e.name.as_ref().map(|n| n.text.clone()), SymbolKind::Enum, scope, span);
        symbol.generated = e.name.as_ref().is_some_and(|n| n.generated);
        symbol.access = access;
        let id = self.table.add_symbol(symbol);
        let members = self.table.add_scope(ScopeKind::Enum, scope, Some(id), e.body);
        self.table.set_members(id, members);
        let ty = FullType {
            name: e.name.iter().map(|n| n.text.clone()).collect(),
            ..FullType::default()
        };
        for enumerator in &e.enumerators {
            if let Some(value) = &enumerator.value {
                self.expression(value, scope);
            }
            let mut symbol = Symbol::new(
                Some(enumerator.name.text.clone()),
                SymbolKind::Enumerator,
                members,
                enumerator.name.span,
            );
            symbol.ty = ty.clone();
            symbol.generated = enumerator.name.generated;
            symbol.is_static = true;
            symbol.access = access;
            let enumerator_id = self.table.add_symbol(symbol);
            if !e.scoped {
                self.table.export_symbol(enumerator_id, scope);
            }
        }
    }

    fn function_definition(
        &mut self,
        function: &FunctionDefinition,
        scope: ScopeId,
        members_parent: Option<ScopeId>,
        access: Access,
    ) {
        if let Some(TypeSpecifier::Class(class)) = &function.specifiers.type_spec {
            self.class(class, scope, members_parent, access);
        }
        let declarator = &function.declarator;
        let span = declarator
            .name
            .as_ref()
            .map(|n| n.last().span)
            .unwrap_or(declarator.span);
        let mut symbol = Symbol::new(
            declarator.name.as_ref().map(|n| n.last().text.clone()),
            SymbolKind::Function,
            scope,
            span,
        );
        symbol.ty = declared_type(&function.specifiers, declarator);
        symbol.qualifier = declarator
            .name
            .as_ref()
            .map(|n| segment_texts(n.qualifier()))
            .unwrap_or_default();
        symbol.generated = declarator.name.as_ref().is_some_and(|n| n.last().generated);
        symbol.is_static = function.specifiers.flags.is_static;
        symbol.access = access;
        let id = self.table.add_symbol(symbol);

        let start = declarator
            .function
            .as_ref()
            .map(|f| f.span.start)
            .unwrap_or(function.body.span.start);
        let body = self.table.add_scope(
            ScopeKind::Function,
            members_parent.unwrap_or(scope),
            Some(id),
            Span::new(start, function.body.span.end),
        );
        self.table.set_members(id, body);
        if let Some(f) = &declarator.function {
            self.parameters(&f.params, body);
        }
        for init in &function.ctor_initializers {
            for arg in &init.args {
                self.expression(arg, body);
            }
        }
        self.statements(&function.body.statements, body);
    }

    fn parameters(&mut self, params: &[ParameterDeclaration], scope: ScopeId) {
        for param in params {
            if let Some(value) = &param.default_value {
                self.expression(value, scope);
            }
            let Some(name) = &param.declarator.name else { continue };
            let last = name.last();
            let mut symbol = Symbol::new(Some(last.text.clone()), SymbolKind::Argument, scope, last.span);
            symbol.ty = declared_type(&param.specifiers, &param.declarator);
            symbol.generated = last.generated;
            self.table.add_symbol(symbol);
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn statements(&mut self, statements: &[Statement], scope: ScopeId) {
        for statement in statements {
            self.statement(statement, scope);
        }
    }

    fn compound(&mut self, compound: &CompoundStatement, scope: ScopeId) {
        let block = self
            .table
            .add_scope(ScopeKind::Block, scope, None, compound.span);
        self.statements(&compound.statements, block);
    }

    fn condition(&mut self, condition: &Condition, scope: ScopeId) {
        match condition {
            Condition::Expression(e) => self.expression(e, scope),
            Condition::Declaration(d) => self.simple_declaration(d, scope, None, Access::Public),
        }
    }

    fn statement(&mut self, statement: &Statement, scope: ScopeId) {
        match statement {
            Statement::Compound(compound) => self.compound(compound, scope),
            Statement::Declaration(declaration) => {
                let mut access = Access::Public;
                self.declaration(declaration, scope, None, &mut access);
            }
            Statement::Expression { expression, .. } => self.expression(expression, scope),
            Statement::If {
                condition,
                then_branch,
                else_branch,
                span,
            } => {
                let block = self.table.add_scope(ScopeKind::Block, scope, None, *span);
                self.condition(condition, block);
                self.statement(then_branch, block);
                if let Some(else_branch) = else_branch {
                    self.statement(else_branch, block);
                }
            }
            Statement::While {
                condition,
                body,
                span,
            }
            | Statement::Switch {
                condition,
                body,
                span,
            } => {
                let block = self.table.add_scope(ScopeKind::Block, scope, None, *span);
                self.condition(condition, block);
                self.statement(body, block);
            }
            Statement::Do {
                body, condition, ..
            } => {
                self.statement(body, scope);
                self.expression(condition, scope);
            }
            Statement::For {
                init,
                condition,
                step,
                body,
                span,
            } => {
                let block = self.table.add_scope(ScopeKind::Block, scope, None, *span);
                if let Some(init) = init {
                    self.statement(init, block);
                }
                if let Some(condition) = condition {
                    self.condition(condition, block);
                }
                if let Some(step) = step {
                    self.expression(step, block);
                }
                self.statement(body, block);
            }
            Statement::ForRange {
                declaration,
                range,
                body,
                span,
            } => {
                let block = self.table.add_scope(ScopeKind::Block, scope, None, *span);
                self.expression(range, block);
                self.simple_declaration(declaration, block, None, Access::Public);
                self.statement(body, block);
            }
            Statement::Case { value, .. } | Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.expression(value, scope);
                }
            }
            Statement::Break(_)
            | Statement::Continue(_)
            | Statement::Empty(_)
            | Statement::Error(_) => {}
        }
    }

    // ------------------------------------------------------------------------
    // Expressions: only lambdas declare anything
    // ------------------------------------------------------------------------

    fn initializer(&mut self, initializer: &Initializer, scope: ScopeId) {
        match initializer {
            Initializer::Assign(e) => self.expression(e, scope),
            Initializer::Braced(list) | Initializer::Call(list) => {
                for e in list {
                    self.expression(e, scope);
                }
            }
        }
    }

    fn declarator_expressions(&mut self, declarator: &Declarator, scope: ScopeId) {
        if let Some(function) = &declarator.function {
            for param in &function.params {
                if let Some(value) = &param.default_value {
                    self.expression(value, scope);
                }
            }
        }
    }

    fn type_id(&mut self, type_id: &TypeId, scope: ScopeId) {
        if let Some(TypeSpecifier::Named(name)) = &type_id.specifiers.type_spec {
            for segment in &name.segments {
                for arg in segment.template_args.iter().flatten() {
                    if let TemplateArgument::Expression(e) = arg {
                        self.expression(e, scope);
                    }
                }
            }
        }
    }

    fn lambda(&mut self, lambda: &LambdaExpression, scope: ScopeId) {
        let body = self
            .table
            .add_scope(ScopeKind::Function, scope, None, lambda.span);
        self.parameters(&lambda.params, body);
        self.statements(&lambda.body.statements, body);
    }

    fn expression(&mut self, expression: &Expression, scope: ScopeId) {
        match expression {
            Expression::Lambda(lambda) => self.lambda(lambda, scope),
            Expression::Member { base, .. } => self.expression(base, scope),
            Expression::Call { callee, args, .. } => {
                self.expression(callee, scope);
                for arg in args {
                    self.expression(arg, scope);
                }
            }
            Expression::Subscript { base, index, .. } => {
                self.expression(base, scope);
                self.expression(index, scope);
            }
            Expression::Unary { operand, .. } | Expression::Delete { operand, .. } => {
                self.expression(operand, scope)
            }
            Expression::Binary { lhs, rhs, .. } => {
                self.expression(lhs, scope);
                self.expression(rhs, scope);
            }
            Expression::Conditional {
                condition,
                then_value,
                else_value,
                ..
            } => {
                self.expression(condition, scope);
                self.expression(then_value, scope);
                self.expression(else_value, scope);
            }
            Expression::Cast { operand, .. } => self.expression(operand, scope),
            Expression::New { args, .. } | Expression::Braced { elements: args, .. } => {
                for arg in args {
                    self.expression(arg, scope);
                }
            }
            Expression::Name(_)
            | Expression::Literal { .. }
            | Expression::This(_)
            | Expression::SizeofType { .. }
            | Expression::QtMethod { .. }
            | Expression::Error(_) => {}
        }
    }
}
