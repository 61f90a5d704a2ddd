//! Quote nesting automaton.
//!
//! Single and double quotes share one three-valued register. A quote of the
//! same kind as the outer one closes it; a quote of the other kind while a
//! region is open leaves the state untouched. Transitions are table driven
//! and must stay exactly as below: the scanner's notion of "inside a string"
//! for `%>` and `>` detection depends on them.

/// Current quoting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum QuoteState {
    /// Not inside any quoted region.
    #[default]
    None = 0,
    /// Outermost open quote is `'`.
    Single = 1,
    /// Outermost open quote is `"`.
    Double = 2,
}

const SINGLE_QUOTE_TRANSITION: [QuoteState; 3] =
    [QuoteState::Single, QuoteState::None, QuoteState::Double];
const DOUBLE_QUOTE_TRANSITION: [QuoteState; 3] =
    [QuoteState::Double, QuoteState::Single, QuoteState::None];

impl QuoteState {
    /// State after reading a `'`.
    #[inline]
    pub fn on_single(self) -> Self {
        SINGLE_QUOTE_TRANSITION[self as usize]
    }

    /// State after reading a `"`.
    #[inline]
    pub fn on_double(self) -> Self {
        DOUBLE_QUOTE_TRANSITION[self as usize]
    }

    /// Feed an arbitrary byte; non-quote bytes leave the state unchanged.
    #[inline]
    pub fn feed(self, byte: u8) -> Self {
        match byte {
            b'\'' => self.on_single(),
            b'"' => self.on_double(),
            _ => self,
        }
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self == QuoteState::None
    }
}
