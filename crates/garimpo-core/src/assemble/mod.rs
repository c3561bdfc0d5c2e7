//! Product assembly strategies.
//!
//! Two ways to group tokens into products: line blocks cut from a page
//! mask, or fixed windows around code anchors when no mask exists.

mod anchor;
mod blocks;

pub use anchor::AnchorAssembler;
pub use blocks::BlockAssembler;

pub(crate) use anchor::merge_preferring_price;
