use crate::context::ValidationContext;
use crate::ir::IrDocument;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;

/// Operations may not nest fields deeper than the configured limit.
///
/// Depth is measured on the rewritten tree with the operation's default
/// variable values, so fields excluded by `@skip`/`@include` don't count.
pub struct QueryDepth {
    max_depth: Option<usize>,
}

impl QueryDepth {
    pub fn new(max_depth: Option<usize>) -> Self {
        Self { max_depth }
    }
}

impl<'a> Rule<'a> for QueryDepth {
    fn name(&self) -> &'static str {
        "QueryDepth"
    }

    fn check_ir(&mut self, ctx: &mut ValidationContext<'a>, ir: &IrDocument) {
        let Some(max_depth) = self.max_depth else {
            return;
        };
        for operation in ir.operations.values() {
            let depth = operation.depth(&operation.default_variables());
            tracing::trace!(operation = ?operation.name, depth, "measured query depth");
            if depth > max_depth {
                ctx.error(
                    codes::QUERY_TOO_DEEP,
                    format!("Query has depth of {depth}, which exceeds max depth of {max_depth}"),
                    [operation.span],
                );
            }
        }
    }
}
