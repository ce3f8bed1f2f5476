//! Node counts of perfect `2^D`-ary trees, measured in "spans": the number of levels below some reference level.

/// The number of nodes `span` levels below a single node.
#[inline]
pub const fn num_nodes_at_span(dim: u32, span: u32) -> usize {
    1 << (dim * span)
}

/// The number of nodes in all levels from `first_span` to `last_span` (inclusive) below a single node.
pub const fn num_nodes_in_spans(dim: u32, first_span: u32, last_span: u32) -> usize {
    let mut sum = 0;
    let mut span = first_span;
    while span <= last_span {
        sum += num_nodes_at_span(dim, span);
        span += 1;
    }

    sum
}

/// The number of nodes in all levels strictly between a node and the level `span` levels below it.
#[inline]
pub const fn num_nodes_above_span(dim: u32, span: u32) -> usize {
    if span <= 1 {
        0
    } else {
        num_nodes_in_spans(dim, 1, span - 1)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
