//! Key bindings: every handler adjusts shared view parameters or returns
//! an engine action; none of them touch panels or legends directly.

use std::sync::Arc;

use crossterm::event::MouseEventKind;
use specterm::keymap::{KeySym, Keymap, UiAction};
use specterm::nav::NavAction;
use specterm::specgram::{ViewParams, MARKFREQ_STEP, NFFT_STEP};

pub fn register_bindings(keymap: &mut Keymap, params: &Arc<ViewParams>, files_per_minute: i64) {
    let p = Arc::clone(params);
    keymap.register(
        KeySym::Up,
        "threshold +1 dB",
        true,
        Box::new(move |_| {
            p.adjust_threshold(1);
            // The legend caches the intensity bar; it must be rebuilt.
            Some(UiAction::Invalidate("intensity".to_string()))
        }),
    );
    let p = Arc::clone(params);
    keymap.register(
        KeySym::Down,
        "threshold -1 dB",
        true,
        Box::new(move |_| {
            p.adjust_threshold(-1);
            Some(UiAction::Invalidate("intensity".to_string()))
        }),
    );
    let p = Arc::clone(params);
    keymap.register(
        KeySym::ShiftUp,
        "NFFT +10",
        true,
        Box::new(move |_| {
            p.adjust_nfft(NFFT_STEP);
            None
        }),
    );
    let p = Arc::clone(params);
    keymap.register(
        KeySym::ShiftDown,
        "NFFT -10",
        true,
        Box::new(move |_| {
            p.adjust_nfft(-NFFT_STEP);
            None
        }),
    );
    let p = Arc::clone(params);
    keymap.register(
        KeySym::Right,
        "mark frequency +200 Hz",
        true,
        Box::new(move |_| {
            p.adjust_markfreq(MARKFREQ_STEP);
            None
        }),
    );
    let p = Arc::clone(params);
    keymap.register(
        KeySym::Left,
        "mark frequency -200 Hz",
        true,
        Box::new(move |_| {
            p.adjust_markfreq(-MARKFREQ_STEP);
            None
        }),
    );
    keymap.register(
        KeySym::PageUp,
        "next file",
        true,
        Box::new(|_| Some(UiAction::Nav(NavAction::NextFile))),
    );
    keymap.register(
        KeySym::PageDown,
        "previous file",
        true,
        Box::new(|_| Some(UiAction::Nav(NavAction::PrevFile))),
    );
    keymap.register(
        KeySym::Esc,
        "resume streaming",
        true,
        Box::new(|_| Some(UiAction::Nav(NavAction::ToEnd))),
    );
    keymap.register(
        KeySym::Char('b'),
        "go to beginning",
        false,
        Box::new(|_| Some(UiAction::Nav(NavAction::ToBeginning))),
    );
    // The shared handler tells the cases apart by the resolved key name.
    keymap.register(
        KeySym::Char('a'),
        "skip back 1 min (A: 10 min)",
        false,
        Box::new(move |press| {
            let files = if press.name == "A" {
                10 * files_per_minute
            } else {
                files_per_minute
            };
            Some(UiAction::Nav(NavAction::Skip(-files)))
        }),
    );
    keymap.register(
        KeySym::Char('d'),
        "skip forward 1 min (D: 10 min)",
        false,
        Box::new(move |press| {
            let files = if press.name == "D" {
                10 * files_per_minute
            } else {
                files_per_minute
            };
            Some(UiAction::Nav(NavAction::Skip(files)))
        }),
    );
    let p = Arc::clone(params);
    keymap.register(
        KeySym::Char('c'),
        "cycle display channel",
        false,
        Box::new(move |_| {
            let channel = p.cycle_channel();
            Some(UiAction::Flash(format!("channel {channel}")))
        }),
    );
    keymap.register(
        KeySym::Char('f'),
        "toggle layout mode",
        false,
        Box::new(|_| Some(UiAction::ToggleLayout)),
    );
    keymap.register(
        KeySym::Char('l'),
        "toggle legends",
        false,
        Box::new(|_| Some(UiAction::ToggleLegends)),
    );
    keymap.register(
        KeySym::Char('m'),
        "minimal legend mode",
        false,
        Box::new(|_| Some(UiAction::ToggleMinimalLegend)),
    );
    keymap.register(
        KeySym::ShiftLeft,
        "drag legends left",
        true,
        Box::new(|_| Some(UiAction::MoveLegendsLeft)),
    );
    keymap.register(
        KeySym::ShiftRight,
        "drag legends right",
        true,
        Box::new(|_| Some(UiAction::MoveLegendsRight)),
    );
    keymap.register(
        KeySym::Enter,
        "snap legends back",
        true,
        Box::new(|_| Some(UiAction::SnapLegendsBack)),
    );
    keymap.register(
        KeySym::Char(' '),
        "toggle this help",
        true,
        Box::new(|_| Some(UiAction::ToggleHelp)),
    );
    keymap.register(
        KeySym::Char('?'),
        "",
        true,
        Box::new(|_| Some(UiAction::ToggleHelp)),
    );
    keymap.register(
        KeySym::Char('q'),
        "quit",
        false,
        Box::new(|_| Some(UiAction::Quit)),
    );
    keymap.register(
        KeySym::Mouse,
        "",
        true,
        Box::new(|press| {
            let event = press.mouse.as_ref()?;
            if matches!(event.kind, MouseEventKind::Down(_)) {
                Some(UiAction::Flash(format!(
                    "click at {},{}",
                    event.column, event.row
                )))
            } else {
                None
            }
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use specterm::keymap::KeyPress;

    fn setup() -> (Keymap, Arc<ViewParams>) {
        let params = Arc::new(ViewParams::new(90, 5, 5000, 240, 1, 19200));
        let mut keymap = Keymap::new();
        register_bindings(&mut keymap, &params, 60);
        (keymap, params)
    }

    #[test]
    fn threshold_keys_adjust_by_one_db() {
        let (mut keymap, params) = setup();
        keymap.dispatch(&KeyPress::new(KeySym::Up));
        keymap.dispatch(&KeyPress::new(KeySym::Up));
        keymap.dispatch(&KeyPress::new(KeySym::Down));
        assert_eq!(params.threshold_db(), 91);
    }

    #[test]
    fn threshold_keys_invalidate_the_intensity_bar() {
        let (mut keymap, _) = setup();
        assert_eq!(
            keymap.dispatch(&KeyPress::new(KeySym::Up)),
            vec![UiAction::Invalidate("intensity".to_string())]
        );
        assert_eq!(
            keymap.dispatch(&KeyPress::new(KeySym::Down)),
            vec![UiAction::Invalidate("intensity".to_string())]
        );
    }

    #[test]
    fn shift_arrows_step_nfft() {
        let (mut keymap, params) = setup();
        keymap.dispatch(&KeyPress::new(KeySym::ShiftUp));
        assert_eq!(params.nfft(), 250);
        keymap.dispatch(&KeyPress::new(KeySym::ShiftDown));
        assert_eq!(params.nfft(), 240);
    }

    #[test]
    fn skip_keys_scale_with_case() {
        let (mut keymap, _) = setup();
        let small = keymap.dispatch(&KeyPress::new(KeySym::Char('a')));
        assert_eq!(small, vec![UiAction::Nav(NavAction::Skip(-60))]);
        let big = keymap.dispatch(&KeyPress::new(KeySym::Char('A')));
        assert_eq!(big, vec![UiAction::Nav(NavAction::Skip(-600))]);
        let fwd = keymap.dispatch(&KeyPress::new(KeySym::Char('D')));
        assert_eq!(fwd, vec![UiAction::Nav(NavAction::Skip(600))]);
    }

    #[test]
    fn quit_is_case_insensitive() {
        let (mut keymap, _) = setup();
        assert_eq!(
            keymap.dispatch(&KeyPress::new(KeySym::Char('Q'))),
            vec![UiAction::Quit]
        );
    }

    #[test]
    fn help_bound_to_space_and_question_mark() {
        let (mut keymap, _) = setup();
        assert_eq!(
            keymap.dispatch(&KeyPress::new(KeySym::Char(' '))),
            vec![UiAction::ToggleHelp]
        );
        assert_eq!(
            keymap.dispatch(&KeyPress::new(KeySym::Char('?'))),
            vec![UiAction::ToggleHelp]
        );
    }
}
