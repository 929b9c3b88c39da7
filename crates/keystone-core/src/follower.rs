//! Pursuers of geoscape targets.
//!
//! Only the dispatch is modeled here: what each kind of follower is told to
//! do when the thing it chases disappears. Movement stays with the geoscape.

use crate::id::{CraftId, UfoId};
use serde::{Deserialize, Serialize};

/// Something following a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Follower {
    Craft(CraftId),
    Ufo(UfoId),
}

/// Order issued to a follower whose target was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowerOrder {
    ReturnToBase(CraftId),
    /// Clear the UFO's destination so its mission logic picks a new one.
    ResetDestination(UfoId),
}

impl Follower {
    pub fn on_target_lost(self) -> FollowerOrder {
        match self {
            Follower::Craft(craft) => FollowerOrder::ReturnToBase(craft),
            Follower::Ufo(ufo) => FollowerOrder::ResetDestination(ufo),
        }
    }
}

/// A geoscape target and the followers chasing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    followers: Vec<Follower>,
}

impl Target {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the follower was already attached.
    pub fn add_follower(&mut self, follower: Follower) -> bool {
        if self.followers.contains(&follower) {
            return false;
        }
        self.followers.push(follower);
        true
    }

    pub fn remove_follower(&mut self, follower: Follower) -> bool {
        let before = self.followers.len();
        self.followers.retain(|&f| f != follower);
        self.followers.len() != before
    }

    pub fn followers(&self) -> &[Follower] {
        &self.followers
    }

    /// Detach every follower and return the orders they should receive, in
    /// the order they started following.
    pub fn release_followers(&mut self) -> Vec<FollowerOrder> {
        self.followers
            .drain(..)
            .map(Follower::on_target_lost)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_variant_has_its_own_order() {
        assert_eq!(
            Follower::Craft(CraftId(1)).on_target_lost(),
            FollowerOrder::ReturnToBase(CraftId(1))
        );
        assert_eq!(
            Follower::Ufo(UfoId(9)).on_target_lost(),
            FollowerOrder::ResetDestination(UfoId(9))
        );
    }

    #[test]
    fn release_drains_in_order() {
        let mut target = Target::new();
        assert!(target.add_follower(Follower::Ufo(UfoId(2))));
        assert!(target.add_follower(Follower::Craft(CraftId(5))));
        assert!(!target.add_follower(Follower::Craft(CraftId(5))));

        let orders = target.release_followers();
        assert_eq!(
            orders,
            vec![
                FollowerOrder::ResetDestination(UfoId(2)),
                FollowerOrder::ReturnToBase(CraftId(5)),
            ]
        );
        assert!(target.followers().is_empty());
    }

    #[test]
    fn remove_reports_presence() {
        let mut target = Target::new();
        target.add_follower(Follower::Craft(CraftId(1)));
        assert!(target.remove_follower(Follower::Craft(CraftId(1))));
        assert!(!target.remove_follower(Follower::Craft(CraftId(1))));
    }
}
