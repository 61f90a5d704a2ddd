//! Per-dialect output fragments and dialect detection.

use crate::matching::{find_attribute, is_space};
use crate::{Result, ScanError};

/// How many leading bytes are searched for an `@ LANGUAGE=` directive.
pub const DETECT_WINDOW: usize = 1024;

/// Opens every translated file: declares the document builder and a code region.
pub const PROLOGUE: &[u8] =
    b"<OBJECT RUNAT=server ID=XMLServDoc PROGID=\"XSLISAPI.XMLServerDocument\"></OBJECT>\r\n<%\r\n";

/// Closes the code region opened by [`PROLOGUE`].
pub const CODE_CLOSE: &[u8] = b"%>";

/// Response-object methods and the document-builder calls they become.
pub const RESPONSE_METHODS: [(&[u8], &[u8]); 4] = [
    (b"RESPONSE.WRITE", b"XMLServDoc.Write"),
    (b"RESPONSE.FLUSH", b"XMLServDoc.Flush"),
    (b"RESPONSE.CLEAR", b"XMLServDoc.Clear"),
    (b"RESPONSE.END", b"XMLServDoc.End"),
];

/// Script dialect of a template, selected once per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageProfile {
    /// VBScript. Used when the file names no language.
    #[default]
    VbScript,
    /// JScript.
    JScript,
}

impl LanguageProfile {
    pub fn name(self) -> &'static str {
        match self {
            LanguageProfile::VbScript => "VBScript",
            LanguageProfile::JScript => "JScript",
        }
    }

    /// Resolve a `LANGUAGE` attribute value (ASCII case-insensitive, exact).
    pub fn from_name(value: &[u8]) -> Option<Self> {
        if value.eq_ignore_ascii_case(b"VBSCRIPT") {
            Some(LanguageProfile::VbScript)
        } else if value.eq_ignore_ascii_case(b"JSCRIPT") {
            Some(LanguageProfile::JScript)
        } else {
            None
        }
    }

    pub fn prologue(self) -> &'static [u8] {
        PROLOGUE
    }

    /// Render call emitted before the code region is closed.
    pub fn generate(self) -> &'static [u8] {
        match self {
            LanguageProfile::VbScript => concat!(
                "XMLServDoc.URL = Request.ServerVariables(\"HTTP_SSXSLSRCFILE\")\r\n",
                "XMLServDoc.UserAgent = Request.ServerVariables(\"HTTP_USER_AGENT\")\r\n",
                "On Error Resume Next\r\n",
                "XMLServDoc.Transform Response\r\n",
                "If Err.Number <> 0 Then\r\n",
                "    XMLServDoc.HandleError Response\r\n",
                "End If\r\n",
            )
            .as_bytes(),
            LanguageProfile::JScript => concat!(
                "XMLServDoc.URL = Request.ServerVariables(\"HTTP_SRCFILE\");\r\n",
                "XMLServDoc.UserAgent = Request.ServerVariables(\"HTTP_USER_AGENT\");\r\n",
                "try {\r\n",
                "    XMLServDoc.Transform(Response);\r\n",
                "} catch (exception) {\r\n",
                "    XMLServDoc.HandleError(Response);\r\n",
                "}\r\n",
            )
            .as_bytes(),
        }
    }

    pub fn write_prefix(self) -> &'static [u8] {
        match self {
            LanguageProfile::VbScript => b"XMLServDoc.Write ",
            LanguageProfile::JScript => b"XMLServDoc.Write(",
        }
    }

    pub fn write_line_prefix(self) -> &'static [u8] {
        match self {
            LanguageProfile::VbScript => b"XMLServDoc.WriteLine ",
            LanguageProfile::JScript => b"XMLServDoc.WriteLine(",
        }
    }

    /// Closes a write or write-line call.
    pub fn write_suffix(self) -> &'static [u8] {
        match self {
            LanguageProfile::VbScript => b"\r\n",
            LanguageProfile::JScript => b");\r\n",
        }
    }

    /// Appended to processing directives so adjacent statements never merge.
    pub fn statement_end(self) -> &'static [u8] {
        match self {
            LanguageProfile::VbScript => b"\r\n",
            LanguageProfile::JScript => b";\r\n",
        }
    }

    /// Embedded `"` are written as `\"` inside one literal rather than
    /// concatenated with `Chr(34)`.
    pub fn escapes_with_backslash(self) -> bool {
        matches!(self, LanguageProfile::JScript)
    }

    /// `'` starts a line comment outside of quotes. Otherwise `//` does, and
    /// `'` delimits strings.
    pub fn apostrophe_comments(self) -> bool {
        matches!(self, LanguageProfile::VbScript)
    }

    /// Select the dialect named by the first `@ LANGUAGE=` directive found
    /// near the start of `src`.
    ///
    /// The directive is not required to sit inside a `<% %>` tag. A value
    /// naming neither dialect fails with [`ScanError::UnsupportedLanguage`].
    pub fn detect(src: &[u8]) -> Result<Self> {
        let limit = src.len().min(DETECT_WINDOW);
        let mut pos = 0;

        while pos < limit {
            if src[pos] != b'@' {
                pos += 1;
                continue;
            }

            pos += 1;
            while pos < limit && is_space(src[pos]) {
                pos += 1;
            }
            if src.get(pos).map(u8::to_ascii_uppercase) != Some(b'L') {
                continue;
            }

            let scan = find_attribute(src, pos, b"LANGUAGE", b'%');
            match scan.value {
                Some(range) => {
                    let value = &src[range];
                    return Self::from_name(value).ok_or_else(|| ScanError::UnsupportedLanguage {
                        name: String::from_utf8_lossy(value).into_owned(),
                    });
                }
                None => pos = scan.tag_end + 1,
            }
        }

        Ok(LanguageProfile::default())
    }
}
