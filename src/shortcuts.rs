use egui::{Key, Modifiers};

use crate::session::{Command, Phase};

pub fn handle_key_event(phase: &Phase, key: Key, modifiers: Modifiers, size_step: i32) -> Option<Command> {
    match phase {
        Phase::Draw => match key {
            Key::Z if modifiers.ctrl => Some(Command::DeleteLastAnnotation),
            _ if modifiers.ctrl || modifiers.alt => None,
            Key::N => Some(Command::ArmDrawLine),
            Key::R => Some(Command::ArmDrawRect),
            Key::Escape => Some(Command::CancelActive),
            Key::Enter => Some(Command::Proceed),
            _ => None,
        },
        Phase::Review(_) => match key {
            _ if modifiers.ctrl || modifiers.alt => None,
            // H for hold, N for not hold
            Key::H => Some(Command::DecideKeep),
            Key::N => Some(Command::DecideDiscard),
            Key::ArrowLeft => Some(Command::ReviewPrev),
            Key::ArrowRight => Some(Command::ReviewNext),
            Key::Plus | Key::Equals => Some(Command::AdjustSize(size_step)),
            Key::Minus => Some(Command::AdjustSize(-size_step)),
            Key::Escape => Some(Command::BackToDraw),
            _ => None,
        },
        Phase::EmptyReview => match key {
            Key::Escape => Some(Command::BackToDraw),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::{Origin, PointOfInterest, Review};
    use crate::geometry::Point;
    use crate::review::ReviewWalker;
    use crate::store::AnnotationId;

    fn review_phase() -> Phase {
        let point = PointOfInterest {
            location: Point::new(1, 1),
            origin: Origin::Rect(AnnotationId(1)),
            name: "rect-1".into(),
            review: Review::Undecided,
            size: None,
            extent: None,
        };
        Phase::Review(ReviewWalker::new(vec![point], 200).unwrap())
    }

    #[test]
    fn n_means_different_things_per_phase() {
        assert_eq!(
            handle_key_event(&Phase::Draw, Key::N, Modifiers::NONE, 5),
            Some(Command::ArmDrawLine)
        );
        assert_eq!(
            handle_key_event(&review_phase(), Key::N, Modifiers::NONE, 5),
            Some(Command::DecideDiscard)
        );
        assert_eq!(handle_key_event(&Phase::EmptyReview, Key::N, Modifiers::NONE, 5), None);
    }

    #[test]
    fn size_keys_use_the_configured_step() {
        let phase = review_phase();
        assert_eq!(
            handle_key_event(&phase, Key::Plus, Modifiers::NONE, 5),
            Some(Command::AdjustSize(5))
        );
        assert_eq!(
            handle_key_event(&phase, Key::Minus, Modifiers::NONE, 10),
            Some(Command::AdjustSize(-10))
        );
    }

    #[test]
    fn ctrl_z_deletes_but_ctrl_n_does_nothing() {
        assert_eq!(
            handle_key_event(&Phase::Draw, Key::Z, Modifiers::CTRL, 5),
            Some(Command::DeleteLastAnnotation)
        );
        assert_eq!(handle_key_event(&Phase::Draw, Key::N, Modifiers::CTRL, 5), None);
        assert_eq!(handle_key_event(&Phase::Draw, Key::Z, Modifiers::NONE, 5), None);
    }
}
