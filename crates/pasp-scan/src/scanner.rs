//! The translation state machine.
//!
//! Text outside of code is turned into `Write`/`WriteLine` calls, one per
//! CR-terminated line. Directives and server code blocks are copied into the
//! script with response-object calls redirected to the document builder.

use crate::cursor::{line_of, Cursor};
use crate::matching::{find_attribute, matches_at, matches_with_delim, matches_word, skip_space};
use crate::profile::{LanguageProfile, CODE_CLOSE, RESPONSE_METHODS};
use crate::quote::QuoteState;
use crate::writer::Writer;
use crate::{Construct, Result, ScanError, ScanSummary};

/// Structural position of the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Text,
    ServerScript,
    ServerObject,
    ProcessingDirective,
    AtDirective,
    OutputDirective,
}

/// Kind of code region being copied by [`Scanner::copy_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeRegion {
    Directive,
    Script,
    Object,
}

impl CodeRegion {
    fn tracks_quotes(self) -> bool {
        !matches!(self, CodeRegion::Object)
    }

    fn rewrites(self) -> bool {
        !matches!(self, CodeRegion::Object)
    }

    fn end_tag(self) -> Option<&'static [u8]> {
        match self {
            CodeRegion::Directive => None,
            CodeRegion::Script => Some(b"SCRIPT"),
            CodeRegion::Object => Some(b"OBJECT"),
        }
    }

    fn construct(self) -> Construct {
        match self {
            CodeRegion::Directive => Construct::Directive,
            CodeRegion::Script => Construct::ScriptBlock,
            CodeRegion::Object => Construct::ObjectBlock,
        }
    }
}

/// Per-translation state. Never shared between threads.
pub struct Scanner<'a, W> {
    cur: Cursor<'a>,
    out: W,
    profile: LanguageProfile,
    mode: Mode,
    in_tag: bool,
    quote: QuoteState,
    /// First byte after a recognized server `<SCRIPT>`/`<OBJECT>` opening tag.
    resume: usize,
    summary: ScanSummary,
}

impl<'a, W: Writer> Scanner<'a, W> {
    pub fn new(src: &'a [u8], profile: LanguageProfile, out: W) -> Self {
        Self {
            cur: Cursor::new(src),
            out,
            profile,
            mode: Mode::Text,
            in_tag: false,
            quote: QuoteState::None,
            resume: 0,
            summary: ScanSummary {
                profile,
                ..ScanSummary::default()
            },
        }
    }

    /// Translate the whole buffer, framed by the profile's prologue and
    /// render epilogue.
    pub fn run(mut self) -> Result<ScanSummary> {
        self.out.const_out(self.profile.prologue())?;

        while !self.cur.is_eof() {
            match self.mode {
                Mode::Text => self.convert_text()?,
                Mode::ProcessingDirective | Mode::AtDirective | Mode::OutputDirective => {
                    self.convert_directive()?
                }
                Mode::ServerScript => self.convert_server_block(CodeRegion::Script)?,
                Mode::ServerObject => self.convert_server_block(CodeRegion::Object)?,
            }
        }

        self.out.const_out(self.profile.generate())?;
        self.out.const_out(CODE_CLOSE)?;
        Ok(self.summary)
    }

    fn convert_text(&mut self) -> Result<()> {
        let src = self.cur.source();
        let mut scan = self.cur.pos();

        while scan < src.len() {
            let begin = scan;
            while let Some(&c) = src.get(scan) {
                match c {
                    b'\r' => break,
                    b'\'' if self.in_tag => self.quote = self.quote.on_single(),
                    b'"' if self.in_tag => self.quote = self.quote.on_double(),
                    b'<' => {
                        if let Some(mode) = self.classify_tag(scan) {
                            self.mode = mode;
                            break;
                        }
                    }
                    b'>' if self.in_tag && self.quote.is_none() => self.in_tag = false,
                    _ => {}
                }
                scan += 1;
            }

            let full_line = src.get(scan) == Some(&b'\r');
            if scan == begin && !full_line {
                break;
            }
            self.write_text(&src[begin..scan], full_line)?;

            if !full_line {
                break;
            }
            scan += 1;
            if src.get(scan) == Some(&b'\n') {
                scan += 1;
            }
        }

        self.cur.seek(scan);
        Ok(())
    }

    /// Decide what a `<` at `at` opens. Returns a new mode when text ends here.
    fn classify_tag(&mut self, at: usize) -> Option<Mode> {
        let src = self.cur.source();

        if src.get(at + 1) == Some(&b'%') {
            if src.get(at + 2) == Some(&b'=') {
                return Some(Mode::OutputDirective);
            }
            return Some(if src.get(skip_space(src, at + 2)) == Some(&b'@') {
                Mode::AtDirective
            } else {
                Mode::ProcessingDirective
            });
        }

        if self.in_tag || !self.quote.is_none() {
            return None;
        }

        let name = at + 1;
        let block = if matches_word(src, name, b"OBJECT") {
            Some(Mode::ServerObject)
        } else if matches_word(src, name, b"SCRIPT") {
            Some(Mode::ServerScript)
        } else {
            None
        };
        if let Some(mode) = block {
            let scan = find_attribute(src, name, b"RUNAT", b'>');
            let runs_at_server = scan
                .value
                .is_some_and(|v| src[v].eq_ignore_ascii_case(b"SERVER"));
            if runs_at_server {
                self.resume = (scan.tag_end + 1).min(src.len());
                return Some(mode);
            }
        }

        self.in_tag = true;
        None
    }

    /// Emit one text line as a quoted string argument.
    fn write_text(&mut self, line: &[u8], full_line: bool) -> Result<()> {
        let profile = self.profile;
        self.out.const_out(if full_line {
            profile.write_line_prefix()
        } else {
            profile.write_prefix()
        })?;

        if !line.contains(&b'"') {
            self.out.const_out(b"\"")?;
            self.out.out(line)?;
            self.out.const_out(b"\"")?;
        } else if profile.escapes_with_backslash() {
            self.out.const_out(b"\"")?;
            for (i, run) in line.split(|&c| c == b'"').enumerate() {
                if i > 0 {
                    self.out.const_out(b"\\\"")?;
                }
                if !run.is_empty() {
                    self.out.out(run)?;
                }
            }
            self.out.const_out(b"\"")?;
        } else {
            // "a" & Chr(34) & "b"
            let mut i = 0;
            while i < line.len() {
                while i < line.len() && line[i] == b'"' {
                    self.out.const_out(if i + 1 < line.len() {
                        b"Chr(34) & "
                    } else {
                        b"Chr(34)"
                    })?;
                    i += 1;
                }
                let run_end = line[i..]
                    .iter()
                    .position(|&c| c == b'"')
                    .map_or(line.len(), |n| i + n);
                if run_end > i {
                    self.out.const_out(b"\"")?;
                    self.out.out(&line[i..run_end])?;
                    self.out.const_out(if run_end < line.len() { b"\" & " } else { b"\"" })?;
                }
                i = run_end;
            }
        }

        self.out.const_out(profile.write_suffix())?;
        self.summary.text_writes += 1;
        Ok(())
    }

    fn convert_directive(&mut self) -> Result<()> {
        let src = self.cur.source();
        let open = self.cur.pos();
        debug_assert!(src[open..].starts_with(b"<%"));

        let begin = match self.mode {
            Mode::ProcessingDirective => open + 2,
            Mode::OutputDirective => {
                self.out.const_out(self.profile.write_prefix())?;
                skip_space(src, open + 2) + 1
            }
            _ => {
                self.out.const_out(b"%>\r\n<%@ ")?;
                skip_space(src, open + 2) + 1
            }
        };

        let resume = self.copy_code(begin, begin, CodeRegion::Directive, open)?;

        match self.mode {
            Mode::ProcessingDirective => self.out.const_out(self.profile.statement_end())?,
            Mode::OutputDirective => self.out.const_out(self.profile.write_suffix())?,
            _ => self.out.const_out(b" %><%\r\n")?,
        }

        self.summary.directives += 1;
        self.cur.seek(resume);
        self.mode = Mode::Text;
        Ok(())
    }

    /// Copy a server `<SCRIPT>` or `<OBJECT>` block, opening tag included,
    /// outside of the generated code region.
    fn convert_server_block(&mut self, region: CodeRegion) -> Result<()> {
        let open = self.cur.pos();
        self.out.const_out(b"%>\r\n")?;
        let resume = self.copy_code(open, self.resume, region, open)?;
        self.out.const_out(b"<%\r\n")?;

        self.summary.code_blocks += 1;
        self.cur.seek(resume);
        self.mode = Mode::Text;
        Ok(())
    }

    /// Copy code from `copy_from`, scanning from `scan_from` for the end of
    /// `region`. Response-object calls outside strings and comments are
    /// spliced out and replaced. Returns the offset just past the region.
    fn copy_code(
        &mut self,
        mut copy_from: usize,
        scan_from: usize,
        region: CodeRegion,
        open: usize,
    ) -> Result<usize> {
        let src = self.cur.source();
        let apostrophe_comments = self.profile.apostrophe_comments();
        let tracks = region.tracks_quotes();
        let mut quote = QuoteState::None;
        let mut comment = false;
        let mut pos = scan_from;

        while let Some(&c) = src.get(pos) {
            match c {
                b'\r' if tracks => comment = false,
                b'\'' if tracks => {
                    if apostrophe_comments {
                        if quote.is_none() {
                            comment = true;
                        }
                    } else if !comment {
                        quote = quote.on_single();
                    }
                }
                b'"' if tracks && !comment => quote = quote.on_double(),
                b'/' if tracks
                    && !apostrophe_comments
                    && quote.is_none()
                    && src.get(pos + 1) == Some(&b'/') =>
                {
                    comment = true
                }
                b'%' if region == CodeRegion::Directive
                    && quote.is_none()
                    && src.get(pos + 1) == Some(&b'>') =>
                {
                    self.out.out(&src[copy_from..pos])?;
                    return Ok(pos + 2);
                }
                b'<' if src.get(pos + 1) == Some(&b'/') => {
                    if let Some(name) = region.end_tag() {
                        if let Some(gt) = matches_with_delim(src, pos + 2, name, b'>') {
                            self.out.out(&src[copy_from..=gt])?;
                            return Ok(gt + 1);
                        }
                    }
                }
                _ if region.rewrites() && quote.is_none() && !comment => {
                    let method = RESPONSE_METHODS
                        .iter()
                        .copied()
                        .find(|(name, _)| matches_at(src, pos, name));
                    if let Some((name, replacement)) = method {
                        self.out.out(&src[copy_from..pos])?;
                        self.out.const_out(replacement)?;
                        self.summary.rewrites += 1;
                        pos += name.len();
                        copy_from = pos;
                        continue;
                    }
                }
                _ => {}
            }
            pos += 1;
        }

        Err(ScanError::Syntax {
            construct: region.construct(),
            offset: open,
            line: line_of(src, open),
        })
    }
}
