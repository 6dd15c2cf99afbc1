/// Inputs of the per-tab width computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRequest {
    pub tab_count: usize,
    pub available_width: i32,
    pub overlap_width: i32,
    pub show_add_button: bool,
    pub add_button_width: i32,
}

/// Skin limits applied to the even split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLimits {
    /// Combined width of the left and right slices.
    pub edge_width: i32,
    pub min_content_width: i32,
    pub max_content_width: i32,
}

/// Width of the stretched center part of every tab.
///
/// The strip width minus the add-button reservation is split evenly; because
/// neighbouring tabs overlap, each of the `n - 1` seams gives back
/// `overlap_width` pixels. The result is clamped to the skin limits, so the
/// same inputs always produce the same width.
pub fn compute_tab_content_width(request: LayoutRequest, limits: ContentLimits) -> i32 {
    let max = limits.max_content_width.max(limits.min_content_width);
    if request.tab_count == 0 {
        return max;
    }
    let count = i32::try_from(request.tab_count).unwrap_or(i32::MAX);
    let reserved = if request.show_add_button {
        request.add_button_width
    } else {
        0
    };
    let usable = request.available_width - reserved
        + request.overlap_width.saturating_mul(count - 1);
    let per_tab = usable.max(0) / count;
    (per_tab - limits.edge_width).clamp(limits.min_content_width, max)
}

/// Left edges of `count` tabs of `tab_width` starting at `start_x`.
pub fn tab_positions(count: usize, start_x: i32, tab_width: i32, overlap_width: i32) -> Vec<i32> {
    let step = (tab_width - overlap_width).max(1);
    (0..count).map(|i| start_x + step * i as i32).collect()
}
