use super::{Candidate, Packer, Score, prune_free_list};
use crate::model::Rect;

/// Guillotine free-list packer: best area fit choice, split along the shorter
/// leftover axis, then prune contained and merge adjacent free rectangles.
pub struct GuillotinePacker {
    free: Vec<Rect>,
}

impl GuillotinePacker {
    pub fn new(area: Rect) -> Self {
        Self { free: vec![area] }
    }

    fn split(fr: &Rect, placed: &Rect) -> (Option<Rect>, Option<Rect>) {
        // Leftover widths/heights (right/bottom), as in Jylänki's SplitFreeRectAlongAxis.
        let w_right = fr.right().saturating_sub(placed.right());
        let h_bottom = fr.bottom().saturating_sub(placed.bottom());
        let split_horizontal = w_right <= h_bottom;

        let mut bottom = Rect::new(fr.x, placed.bottom(), 0, fr.h.saturating_sub(placed.h));
        let mut right = Rect::new(placed.right(), fr.y, fr.w.saturating_sub(placed.w), 0);
        if split_horizontal {
            bottom.w = fr.w;
            right.h = placed.h;
        } else {
            bottom.w = placed.w;
            right.h = fr.h;
        }
        let r1 = (bottom.w > 0 && bottom.h > 0).then_some(bottom);
        let r2 = (right.w > 0 && right.h > 0).then_some(right);
        (r1, r2)
    }

    fn merge_free_list(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..self.free.len() {
                for j in i + 1..self.free.len() {
                    let a = self.free[i];
                    let b = self.free[j];
                    // horizontal merge (same y, height, contiguous in x)
                    if a.y == b.y && a.h == b.h {
                        if a.right() == b.x {
                            self.free[i] = Rect::new(a.x, a.y, a.w + b.w, a.h);
                            self.free.remove(j);
                            merged = true;
                            break 'outer;
                        } else if b.right() == a.x {
                            self.free[i] = Rect::new(b.x, a.y, a.w + b.w, a.h);
                            self.free.remove(j);
                            merged = true;
                            break 'outer;
                        }
                    }
                    // vertical merge (same x, width, contiguous in y)
                    if a.x == b.x && a.w == b.w {
                        if a.bottom() == b.y {
                            self.free[i] = Rect::new(a.x, a.y, a.w, a.h + b.h);
                            self.free.remove(j);
                            merged = true;
                            break 'outer;
                        } else if b.bottom() == a.y {
                            self.free[i] = Rect::new(a.x, b.y, a.w, a.h + b.h);
                            self.free.remove(j);
                            merged = true;
                            break 'outer;
                        }
                    }
                }
            }
        }
    }
}

impl Packer for GuillotinePacker {
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
        let fr = self.free.swap_remove(candidate.free_index);
        let (a, b) = Self::split(&fr, &candidate.slot);
        self.free.extend(a);
        self.free.extend(b);
        prune_free_list(&mut self.free);
        self.merge_free_list();
    }

    fn free_rects(&self) -> &[Rect] {
        &self.free
    }
}
