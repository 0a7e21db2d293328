//! The single in-progress review a user is composing.

use pd_core::{Comment, NewReview, PlaygroundId, Rating};

/// At most one draft exists at a time. It is aimed at one playground, chosen
/// explicitly through [`Draft::focus`]; every other playground's inputs show
/// the defaults (empty text, rating 5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    target: Option<PlaygroundId>,
    comment: String,
    rating: Rating,
}

/// A draft that passed the submit precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub playground: PlaygroundId,
    pub review: NewReview,
}

impl Draft {
    pub fn target(&self) -> Option<&PlaygroundId> {
        self.target.as_ref()
    }

    pub fn is_aimed_at(&self, playground: &PlaygroundId) -> bool {
        self.target.as_ref() == Some(playground)
    }

    /// Aims the draft at `playground`. Moving to a different playground drops
    /// whatever was typed for the previous one.
    pub fn focus(&mut self, playground: PlaygroundId) {
        if !self.is_aimed_at(&playground) {
            *self = Self {
                target: Some(playground),
                ..Self::default()
            };
        }
    }

    /// Returns `false` when there is no target to edit.
    pub fn set_comment(&mut self, text: impl Into<String>) -> bool {
        if self.target.is_none() {
            return false;
        }
        self.comment = text.into();
        true
    }

    /// Returns `false` when there is no target to edit.
    pub fn set_rating(&mut self, rating: Rating) -> bool {
        if self.target.is_none() {
            return false;
        }
        self.rating = rating;
        true
    }

    /// Text shown in `playground`'s input.
    pub fn comment_for(&self, playground: &PlaygroundId) -> &str {
        if self.is_aimed_at(playground) {
            &self.comment
        } else {
            ""
        }
    }

    /// Rating shown in `playground`'s selector.
    pub fn rating_for(&self, playground: &PlaygroundId) -> Rating {
        if self.is_aimed_at(playground) {
            self.rating
        } else {
            Rating::default()
        }
    }

    /// `None` when there is no target or the trimmed text is empty.
    pub fn submission(&self) -> Option<Submission> {
        let playground = self.target.clone()?;
        let comment = Comment::parse(&self.comment).ok()?;
        Some(Submission {
            playground,
            review: NewReview::new(self.rating, comment),
        })
    }

    /// Takes the draft out for submission, leaving an empty one behind, so a
    /// second submit of the same text finds nothing to send. The returned
    /// draft is what [`Draft::restore`] puts back if the write fails.
    pub fn take_submission(&mut self) -> Option<(Submission, Draft)> {
        let submission = self.submission()?;
        Some((submission, std::mem::take(self)))
    }

    /// Puts a taken draft back unless a new one was started meanwhile.
    /// Returns whether it was restored.
    pub fn restore(&mut self, taken: Draft) -> bool {
        if self.target.is_some() {
            return false;
        }
        *self = taken;
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
