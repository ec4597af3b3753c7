//! Tag reconciliation - rebuilds a post's tag links from a raw phrase.
//!
//! The post's links are dropped and recreated from scratch instead of being
//! diffed. Tags that lose their last link are deleted in the same transaction,
//! so no tag outlives its final post.

use std::collections::BTreeSet;

use crate::domain::{PostId, TagId, parse_tag_phrase};
use crate::error::DomainError;
use crate::ports::StoreTransaction;

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReconciliation {
    /// Tags linked to the post afterwards.
    pub linked: Vec<TagId>,
    /// How many of those tags did not exist before.
    pub created: usize,
    /// Previously linked tags deleted because nothing references them anymore.
    pub collected: Vec<TagId>,
}

/// Make the tags of `post_id` exactly the names in `phrase`.
///
/// Must run inside the transaction that wrote the post. Reference counts are
/// read after this call's own link writes.
pub async fn reconcile_tags(
    tx: &mut dyn StoreTransaction,
    post_id: PostId,
    phrase: &str,
) -> Result<TagReconciliation, DomainError> {
    let names = parse_tag_phrase(phrase);

    let previous = tx.tag_ids_for_post(post_id).await?;
    tx.unlink_post_tags(post_id).await?;

    let mut linked = BTreeSet::new();
    let mut created = 0;
    for name in &names {
        let tag = match tx.find_tag_by_name(name).await? {
            Some(tag) => tag,
            None => {
                created += 1;
                tx.insert_tag(name).await?
            }
        };
        tx.link_post_tag(post_id, tag.id).await?;
        linked.insert(tag.id);
    }

    let mut collected = Vec::new();
    for tag_id in previous {
        if linked.contains(&tag_id) {
            continue;
        }
        if tx.count_tag_references(tag_id).await? == 0 {
            tx.delete_tag(tag_id).await?;
            collected.push(tag_id);
        }
    }

    tracing::debug!(
        post_id,
        linked = linked.len(),
        created,
        collected = collected.len(),
        "Reconciled post tags"
    );

    Ok(TagReconciliation {
        linked: linked.into_iter().collect(),
        created,
        collected,
    })
}
