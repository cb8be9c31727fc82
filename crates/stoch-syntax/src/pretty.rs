//! Pretty printer for the PRISM AST.
//!
//! Re-renders a parsed program in canonical form. The expression printer is
//! shared with `stoch-logic`, whose round-trip law (render-parse-render is
//! the identity) depends on it.

use crate::ast::*;

/// Pretty print a program to a string.
pub fn pretty_print(program: &Program) -> String {
    let mut printer = PrettyPrinter::new();
    printer.print_program(program);
    printer.output
}

/// Pretty print an expression to a string.
pub fn pretty_print_expr(expr: &Expr) -> String {
    let mut printer = PrettyPrinter::new();
    printer.print_expr(expr);
    printer.output
}

struct PrettyPrinter {
    output: String,
}

impl PrettyPrinter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn writeln(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn newline(&mut self) {
        self.output.push('\n');
    }

    fn print_program(&mut self, program: &Program) {
        self.writeln(program.model_type.keyword());

        if !program.constants.is_empty() {
            self.newline();
            for c in &program.constants {
                self.print_constant(c);
            }
        }
        if !program.globals.is_empty() {
            self.newline();
            for v in &program.globals {
                self.write("global ");
                self.print_var_decl(v);
            }
        }
        if !program.formulas.is_empty() {
            self.newline();
            for f in &program.formulas {
                self.write("formula ");
                self.write(&f.name.name);
                self.write(" = ");
                self.print_expr(&f.expr);
                self.writeln(";");
            }
        }

        for module in &program.modules {
            self.newline();
            self.print_module(module);
        }

        for rewards in &program.rewards {
            self.newline();
            self.print_rewards(rewards);
        }

        if !program.labels.is_empty() {
            self.newline();
            for l in &program.labels {
                self.write("label \"");
                self.write(&l.name);
                self.write("\" = ");
                self.print_expr(&l.expr);
                self.writeln(";");
            }
        }
    }

    fn print_constant(&mut self, c: &ConstantDecl) {
        self.write("const ");
        self.write(&c.ty.to_string());
        self.write(" ");
        self.write(&c.name.name);
        if let Some(value) = &c.value {
            self.write(" = ");
            self.print_expr(value);
        }
        self.writeln(";");
    }

    fn print_var_decl(&mut self, v: &VarDecl) {
        self.write(&v.name.name);
        self.write(" : ");
        match &v.range {
            VarRange::Bool => self.write("bool"),
            VarRange::BoundedInt { low, high } => {
                self.write("[");
                self.print_expr(low);
                self.write("..");
                self.print_expr(high);
                self.write("]");
            }
        }
        if let Some(init) = &v.init {
            self.write(" init ");
            self.print_expr(init);
        }
        self.writeln(";");
    }

    fn print_module(&mut self, module: &ModuleDecl) {
        self.write("module ");
        self.writeln(&module.name.name);

        for v in &module.vars {
            self.write("    ");
            self.print_var_decl(v);
        }
        if !module.vars.is_empty() && !module.commands.is_empty() {
            self.newline();
        }
        for c in &module.commands {
            self.write("    ");
            self.print_command(c);
        }

        self.writeln("endmodule");
    }

    fn print_command(&mut self, command: &Command) {
        self.write("[");
        if let Some(action) = &command.action {
            self.write(&action.name);
        }
        self.write("] ");
        self.print_expr(&command.guard);
        self.write(" -> ");
        for (i, update) in command.updates.iter().enumerate() {
            if i > 0 {
                self.write(" + ");
            }
            self.print_update(update);
        }
        self.writeln(";");
    }

    fn print_update(&mut self, update: &Update) {
        if let Some(probability) = &update.probability {
            self.print_expr(probability);
            self.write(" : ");
        }
        if update.assignments.is_empty() {
            self.write("true");
            return;
        }
        for (i, a) in update.assignments.iter().enumerate() {
            if i > 0 {
                self.write(" & ");
            }
            self.write("(");
            self.write(&a.var.name);
            self.write("'=");
            self.print_expr(&a.value);
            self.write(")");
        }
    }

    fn print_rewards(&mut self, rewards: &RewardsDecl) {
        self.write("rewards");
        if let Some(name) = &rewards.name {
            self.write(" \"");
            self.write(name);
            self.write("\"");
        }
        self.newline();
        for item in &rewards.items {
            self.write("    ");
            match item {
                RewardItem::State { guard, value, .. } => {
                    self.print_expr(guard);
                    self.write(" : ");
                    self.print_expr(value);
                    self.writeln(";");
                }
                RewardItem::Action {
                    action,
                    guard,
                    value,
                    ..
                } => {
                    self.write("[");
                    if let Some(action) = action {
                        self.write(&action.name);
                    }
                    self.write("] ");
                    self.print_expr(guard);
                    self.write(" : ");
                    self.print_expr(value);
                    self.writeln(";");
                }
            }
        }
        self.writeln("endrewards");
    }

    fn print_expr(&mut self, expr: &Expr) {
        self.print_expr_prec(expr, 0);
    }

    /// Print an expression, inserting parentheses only where the parent
    /// context requires tighter binding than `min_prec`.
    fn print_expr_prec(&mut self, expr: &Expr, min_prec: u8) {
        match &expr.kind {
            ExprKind::Bool(b) => self.write(if *b { "true" } else { "false" }),
            ExprKind::Int(n) => self.write(&n.to_string()),
            ExprKind::Double(x) => self.write(&x.to_string()),
            ExprKind::Ident(name) => self.write(name),
            ExprKind::Unary { op, operand } => {
                self.write(match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                });
                self.print_expr_prec(operand, u8::MAX);
            }
            ExprKind::Binary { op, left, right } => {
                let prec = op.precedence();
                let parens = prec < min_prec;
                if parens {
                    self.write("(");
                }
                let (left_min, right_min) = if op.is_right_assoc() {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.print_expr_prec(left, left_min);
                // Logical connectives are spaced, comparisons and
                // arithmetic are tight: `s=7 & d=1`, `0.5*x+1`. The
                // property layer renders its connectives the same way.
                if matches!(op, BinOp::Iff | BinOp::Implies | BinOp::Or | BinOp::And) {
                    self.write(" ");
                    self.write(op.symbol());
                    self.write(" ");
                } else {
                    self.write(op.symbol());
                }
                self.print_expr_prec(right, right_min);
                if parens {
                    self.write(")");
                }
            }
            ExprKind::Ite {
                cond,
                then_branch,
                else_branch,
            } => {
                let parens = min_prec > 0;
                if parens {
                    self.write("(");
                }
                self.print_expr_prec(cond, 1);
                self.write(" ? ");
                self.print_expr_prec(then_branch, 1);
                self.write(" : ");
                self.print_expr(else_branch);
                if parens {
                    self.write(")");
                }
            }
            ExprKind::Call { func, args } => {
                self.write(func.name());
                self.write("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.write(",");
                    }
                    self.print_expr(arg);
                }
                self.write(")");
            }
            ExprKind::Paren(inner) => {
                self.write("(");
                self.print_expr(inner);
                self.write(")");
            }
        }
    }
}
