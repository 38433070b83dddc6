//! Relations between ambisonics order and channel count.

/// Number of channels in a full set of the given order: `(order + 1)²`.
///
/// `None` when the count does not fit in a `u32`, from order 65535 on.
pub fn order_to_channels(order: u32) -> Option<u32> {
    let side = order.checked_add(1)?;
    side.checked_mul(side)
}

/// Order of a full set with `channels` channels, if there is one.
pub fn channels_to_order(channels: u32) -> Option<u32> {
    if channels == 0 {
        return None;
    }
    let root = channels.isqrt();
    (root * root == channels).then(|| root - 1)
}

pub fn is_full_set(channels: u32) -> bool {
    channels_to_order(channels).is_some()
}

/// Same as [`is_full_set`] for `usize` counts such as matrix dimensions.
pub fn is_full_set_usize(channels: usize) -> bool {
    u32::try_from(channels).is_ok_and(is_full_set)
}
