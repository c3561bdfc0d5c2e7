//! Token-to-block assignment by center containment.

use tracing::debug;

use super::{LineBlock, Token};

/// A line block together with the tokens whose centers fall inside it.
#[derive(Debug, Clone)]
pub struct BlockTokens {
    pub block: LineBlock,
    pub tokens: Vec<Token>,
}

/// Attach each token to the first block containing its center.
///
/// Blocks are scanned in the order given, so with overlapping boxes the
/// earlier block wins and a token is never counted twice. Blocks that
/// end up with no tokens are discarded.
pub fn assign_tokens(tokens: &[Token], blocks: &[LineBlock]) -> Vec<BlockTokens> {
    let mut grouped: Vec<BlockTokens> = blocks
        .iter()
        .map(|b| BlockTokens {
            block: b.clone(),
            tokens: Vec::new(),
        })
        .collect();

    let mut unassigned = 0usize;
    for token in tokens {
        let (cx, cy) = token.center();
        let slot = grouped
            .iter_mut()
            .find(|g| g.block.bbox.contains_point(cx, cy));
        match slot {
            Some(g) => g.tokens.push(token.clone()),
            None => unassigned += 1,
        }
    }

    if unassigned > 0 {
        debug!("{} tokens fell outside every block", unassigned);
    }

    grouped.retain(|g| !g.tokens.is_empty());
    grouped
}
