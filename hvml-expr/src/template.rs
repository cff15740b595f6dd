/// One piece of a string-template interpolation (§3 "string-template
/// interpolation"). Generic over the expression type so `hvml-expr`'s own
/// `Expr` and any future pre-compiled representation (e.g. in
/// `hvml-exprvar`) can reuse the same segment shape.
#[derive(Debug, Clone)]
pub enum Segment<E> {
    Literal(String),
    Expr(E),
}
