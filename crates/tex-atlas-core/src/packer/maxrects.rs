use super::{Candidate, Packer, Score, prune_free_list};
use crate::model::Rect;

/// MaxRects free-list packer (best area fit).
///
/// Every free rectangle intersecting a placed slot is replaced by its maximal
/// left/right/top/bottom remainders; remainders contained in another free
/// rectangle are pruned.
pub struct MaxRectsPacker {
    free: Vec<Rect>,
}

impl MaxRectsPacker {
    pub fn new(area: Rect) -> Self {
        Self { free: vec![area] }
    }

    fn split_free_node(fr: Rect, node: &Rect, out: &mut Vec<Rect>) {
        // Left
        if node.x > fr.x {
            out.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
        }
        // Right
        if node.right() < fr.right() {
            out.push(Rect::new(node.right(), fr.y, fr.right() - node.right(), fr.h));
        }
        // Top
        if node.y > fr.y {
            out.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
        }
        // Bottom
        if node.bottom() < fr.bottom() {
            out.push(Rect::new(fr.x, node.bottom(), fr.w, fr.bottom() - node.bottom()));
        }
    }
}

impl Packer for MaxRectsPacker {
    fn find(&self, w: u32, h: u32) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for (i, fr) in self.free.iter().enumerate() {
            if fr.w < w || fr.h < h {
                continue;
            }
            let score = Score::best_area_fit(fr, w, h);
            if best.is_none_or(|b| score < b.score) {
                best = Some(Candidate {
                    slot: Rect::new(fr.x, fr.y, w, h),
                    score,
                    free_index: i,
                });
            }
        }
        best
    }

    fn place(&mut self, candidate: &Candidate) {
        let node = candidate.slot;
        let mut next: Vec<Rect> = Vec::with_capacity(self.free.len() + 4);
        for fr in self.free.drain(..) {
            if fr.intersects(&node) {
                Self::split_free_node(fr, &node, &mut next);
            } else {
                next.push(fr);
            }
        }
        next.retain(|r| r.w > 0 && r.h > 0);
        self.free = next;
        prune_free_list(&mut self.free);
    }

    fn free_rects(&self) -> &[Rect] {
        &self.free
    }
}
