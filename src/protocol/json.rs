//! Streaming JSON builder.
//!
//! Emits nested objects and arrays directly into an owned buffer with
//! correct brace/bracket/comma placement. Frames close in strict LIFO order
//! and the buffer can only be taken once every frame is closed, so a scope
//! can never leak across an await: handlers gather all asynchronous data
//! first and build the payload in one synchronous pass.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object { has_fields: bool },
    Array { has_items: bool },
}

/// Nested JSON emitter over an owned buffer.
#[derive(Debug, Default)]
pub struct JsonStream {
    buf: Vec<u8>,
    frames: Vec<Frame>,
}

impl JsonStream {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Open an object, as an array item or the root value.
    pub fn begin_object(&mut self) {
        self.item_separator();
        self.buf.push(b'{');
        self.frames.push(Frame::Object { has_fields: false });
    }

    /// Open an object-valued field of the current object.
    pub fn begin_object_field(&mut self, name: &str) {
        self.key(name);
        self.buf.push(b'{');
        self.frames.push(Frame::Object { has_fields: false });
    }

    pub fn end_object(&mut self) {
        let frame = self.frames.pop();
        debug_assert!(
            matches!(frame, Some(Frame::Object { .. })),
            "end_object without a matching begin_object"
        );
        self.buf.push(b'}');
    }

    /// Open an array, as an array item or the root value.
    pub fn begin_array(&mut self) {
        self.item_separator();
        self.buf.push(b'[');
        self.frames.push(Frame::Array { has_items: false });
    }

    /// Open an array-valued field of the current object.
    pub fn begin_array_field(&mut self, name: &str) {
        self.key(name);
        self.buf.push(b'[');
        self.frames.push(Frame::Array { has_items: false });
    }

    pub fn end_array(&mut self) {
        let frame = self.frames.pop();
        debug_assert!(
            matches!(frame, Some(Frame::Array { .. })),
            "end_array without a matching begin_array"
        );
        self.buf.push(b']');
    }

    pub fn field_str(&mut self, name: &str, value: &str) {
        self.key(name);
        self.write_escaped(value);
    }

    pub fn field_u64(&mut self, name: &str, value: u64) {
        self.key(name);
        self.buf.extend_from_slice(value.to_string().as_bytes());
    }

    pub fn field_i64(&mut self, name: &str, value: i64) {
        self.key(name);
        self.buf.extend_from_slice(value.to_string().as_bytes());
    }

    pub fn field_f64(&mut self, name: &str, value: f64) {
        self.key(name);
        self.buf.extend_from_slice(value.to_string().as_bytes());
    }

    pub fn field_bool(&mut self, name: &str, value: bool) {
        self.key(name);
        self.buf
            .extend_from_slice(if value { b"true" } else { b"false" });
    }

    pub fn field_null(&mut self, name: &str) {
        self.key(name);
        self.buf.extend_from_slice(b"null");
    }

    /// A string element of the current array.
    pub fn item_str(&mut self, value: &str) {
        self.item_separator();
        self.write_escaped(value);
    }

    /// Take the finished payload.
    ///
    /// Must not be called with open frames; unbalanced scopes are a
    /// programming error caught in debug builds.
    pub fn finish(self) -> Vec<u8> {
        debug_assert!(self.frames.is_empty(), "unbalanced JSON frames");
        self.buf
    }

    fn key(&mut self, name: &str) {
        match self.frames.last_mut() {
            Some(Frame::Object { has_fields }) => {
                if std::mem::replace(has_fields, true) {
                    self.buf.push(b',');
                }
            }
            _ => debug_assert!(false, "field emitted outside an object"),
        }
        self.write_escaped(name);
        self.buf.push(b':');
    }

    fn item_separator(&mut self) {
        if let Some(Frame::Array { has_items }) = self.frames.last_mut() {
            if std::mem::replace(has_items, true) {
                self.buf.push(b',');
            }
        }
    }

    fn write_escaped(&mut self, value: &str) {
        self.buf.push(b'"');
        for byte in value.bytes() {
            match byte {
                b'"' => self.buf.extend_from_slice(b"\\\""),
                b'\\' => self.buf.extend_from_slice(b"\\\\"),
                b'\n' => self.buf.extend_from_slice(b"\\n"),
                b'\r' => self.buf.extend_from_slice(b"\\r"),
                b'\t' => self.buf.extend_from_slice(b"\\t"),
                0x00..=0x1f => {
                    self.buf
                        .extend_from_slice(format!("\\u{byte:04x}").as_bytes());
                }
                _ => self.buf.push(byte),
            }
        }
        self.buf.push(b'"');
    }
}
