/// The abstract interface the core calls into for every effect that crosses out to an
/// embedder: key state, screen/vblank notification, and palette updates.
///
/// The core never blocks on any of these — every call is a synchronous notification or a
/// synchronous query, matching the cooperative, single-threaded scheduling model (§5).
pub trait Host {
    /// True if no interactive input/output is wired up (used by the scheduler to skip display
    /// wait stalls when nothing will ever observe the screen).
    fn is_headless(&self) -> bool;

    /// Returns a signed key id: positive is `key+1` for a key just pressed this poll, negative
    /// is `-(key+1)` for a key just released, zero means nothing changed.
    fn get_key_pressed(&mut self) -> i32;

    fn is_key_down(&self, key: u8) -> bool;

    fn is_key_up(&self, key: u8) -> bool {
        !self.is_key_down(key)
    }

    /// A 16-bit snapshot of key states, bit `n` set iff key `n` is down.
    fn get_key_states(&self) -> u16;

    /// Called immediately before a full-screen clear, so a host that wants to diff frames can
    /// snapshot beforehand.
    fn pre_clear(&mut self) {}

    /// The visible plane changed and should be redrawn.
    fn update_screen(&mut self) {}

    /// Frame boundary marker; called once per tick even when the screen did not change.
    fn vblank(&mut self) {}

    /// XO-CHIP `5xy4` / full-palette replace.
    fn update_palette(&mut self, _colors: &[u32; 16]) {}

    /// MEGACHIP `02nn` palette range update, `offset` is the first entry touched.
    fn update_palette_range(&mut self, _colors: &[u32], _offset: usize) {}
}

/// A `Host` with no interactive input/output, grounded in the upstream project's own
/// `Chip8HeadlessHostEx`: every callback is a no-op, no key is ever down, and `getKeyPressed`
/// always reports nothing pressed. This gives embedders and the crate's own tests a working
/// host wherever keyboard/video/audio wiring isn't the point of the exercise.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessHost;

impl Host for HeadlessHost {
    fn is_headless(&self) -> bool {
        true
    }

    fn get_key_pressed(&mut self) -> i32 {
        0
    }

    fn is_key_down(&self, _key: u8) -> bool {
        false
    }

    fn get_key_states(&self) -> u16 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_host_reports_headless() {
        assert!(HeadlessHost.is_headless());
    }

    #[test]
    fn test_headless_host_no_keys_down() {
        let host = HeadlessHost;
        for key in 0..16 {
            assert!(!host.is_key_down(key));
            assert!(host.is_key_up(key));
        }
    }

    #[test]
    fn test_headless_host_get_key_pressed_is_zero() {
        assert_eq!(HeadlessHost.get_key_pressed(), 0);
    }

    #[test]
    fn test_headless_host_key_states_empty() {
        assert_eq!(HeadlessHost.get_key_states(), 0);
    }
}
