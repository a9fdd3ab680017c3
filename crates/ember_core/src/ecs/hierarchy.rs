//! Parent/child relations between owners of one context.
//!
//! Relations are weak: they hold ids, not ownership. Detaching a node
//! un-parents its children instead of destroying them.

use crate::define_component;
use crate::ecs::{ContextError, EntityContext, OwnerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    parent: Option<OwnerId>,
    children: Vec<OwnerId>,
}

define_component!(HierarchyNode, "HierarchyNode");

impl HierarchyNode {
    pub fn parent(&self) -> Option<OwnerId> {
        self.parent
    }

    pub fn children(&self) -> &[OwnerId] {
        &self.children
    }
}

#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("owner {owner} cannot be its own parent")]
    SelfParent { owner: OwnerId },
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { child: OwnerId, parent: OwnerId },
    #[error(transparent)]
    Context(#[from] ContextError),
}

fn ensure_node(ctx: &mut EntityContext, owner: OwnerId) -> Result<(), ContextError> {
    if !ctx.has::<HierarchyNode>(owner) {
        ctx.set(owner, HierarchyNode::default())?;
    }
    Ok(())
}

/// Places `child` under `parent`, moving it away from any previous parent.
pub fn attach(
    ctx: &mut EntityContext,
    child: OwnerId,
    parent: OwnerId,
) -> Result<(), HierarchyError> {
    if child == parent {
        return Err(HierarchyError::SelfParent { owner: child });
    }
    for owner in [child, parent] {
        if !ctx.is_allocated(owner) {
            return Err(ContextError::UnknownOwner {
                owner,
                namespace: ctx.namespace(),
            }
            .into());
        }
    }
    if ancestors(ctx, parent).any(|ancestor| ancestor == child) {
        return Err(HierarchyError::Cycle { child, parent });
    }

    ensure_node(ctx, child)?;
    ensure_node(ctx, parent)?;

    let previous = ctx.get::<HierarchyNode>(child)?.parent;
    if previous == Some(parent) {
        return Ok(());
    }
    if let Some(previous) = previous {
        ctx.get_mut::<HierarchyNode>(previous)?
            .children
            .retain(|&c| c != child);
    }

    ctx.get_mut::<HierarchyNode>(child)?.parent = Some(parent);
    ctx.get_mut::<HierarchyNode>(parent)?.children.push(child);
    tracing::trace!(%child, %parent, "attached");
    Ok(())
}

/// Clears the child's parent link but keeps its node and children.
pub fn unparent(ctx: &mut EntityContext, child: OwnerId) -> Result<(), HierarchyError> {
    let Some(parent) = parent_of(ctx, child) else {
        return Ok(());
    };
    ctx.get_mut::<HierarchyNode>(parent)?
        .children
        .retain(|&c| c != child);
    ctx.get_mut::<HierarchyNode>(child)?.parent = None;
    Ok(())
}

/// Removes the owner's node, un-parents its children and drops it from its
/// parent's child list.
pub fn detach(ctx: &mut EntityContext, owner: OwnerId) -> Result<(), HierarchyError> {
    Ok(detach_node(ctx, owner)?)
}

pub(crate) fn detach_node(ctx: &mut EntityContext, owner: OwnerId) -> Result<(), ContextError> {
    // Links are read before removal; dispose hooks may clear the node.
    let node = ctx.get::<HierarchyNode>(owner)?.clone();
    ctx.remove::<HierarchyNode>(owner)?;
    if let Some(parent) = node.parent {
        if let Some(parent_node) = ctx.try_get_mut::<HierarchyNode>(parent) {
            parent_node.children.retain(|&c| c != owner);
        }
    }
    for child in node.children {
        if let Some(child_node) = ctx.try_get_mut::<HierarchyNode>(child) {
            child_node.parent = None;
        }
    }
    Ok(())
}

pub fn parent_of(ctx: &EntityContext, owner: OwnerId) -> Option<OwnerId> {
    ctx.try_get::<HierarchyNode>(owner).and_then(|node| node.parent)
}

pub fn children_of(ctx: &EntityContext, owner: OwnerId) -> &[OwnerId] {
    ctx.try_get::<HierarchyNode>(owner)
        .map(|node| node.children.as_slice())
        .unwrap_or(&[])
}

/// Walks parent links upward, nearest first.
pub fn ancestors(ctx: &EntityContext, owner: OwnerId) -> Ancestors<'_> {
    Ancestors {
        ctx,
        next: parent_of(ctx, owner),
    }
}

pub struct Ancestors<'a> {
    ctx: &'a EntityContext,
    next: Option<OwnerId>,
}

impl Iterator for Ancestors<'_> {
    type Item = OwnerId;

    fn next(&mut self) -> Option<OwnerId> {
        let current = self.next?;
        self.next = parent_of(self.ctx, current);
        Some(current)
    }
}
