//! Custom violation paths built from declared node names.

use constraints_core::ConstraintContext;

/// Replaces the default violation with one whose path visits `nodes` in
/// declared order, below the context's base path.
///
/// Does nothing when `nodes` is empty, leaving the default violation in
/// place.
pub fn report_violation(context: &mut ConstraintContext, message: &str, nodes: &[String]) {
    let Some((first, rest)) = nodes.split_first() else {
        return;
    };

    context.disable_default_violation();
    rest.iter()
        .fold(
            context.build_violation(message).add_property_node(first),
            |builder, node| builder.add_property_node(node),
        )
        .finish();
}
