use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Value};
use crate::{ByteBuffer, Error, Result};

/// An AMF0 command message body: name, transaction id, command object
/// and trailing arguments
#[derive(Debug, Clone)]
pub struct RtmpCommand {
    pub name: String,
    pub transaction_id: f64,
    pub command_object: Option<Amf0Value>,
    pub arguments: Vec<Amf0Value>,
}

impl RtmpCommand {
    pub fn new(name: impl Into<String>, transaction_id: f64) -> Self {
        RtmpCommand {
            name: name.into(),
            transaction_id,
            command_object: None,
            arguments: Vec::new(),
        }
    }

    /// connect(app, tcUrl)
    pub fn connect(app: &str, tc_url: &str) -> Self {
        let mut cmd = RtmpCommand::new("connect", 1.0);
        cmd.command_object = Some(crate::amf::amf0_object([
            ("app", Amf0Value::String(app.to_string())),
            ("type", Amf0Value::String("nonprivate".to_string())),
            ("flashVer", Amf0Value::String("FMLE/3.0".to_string())),
            ("tcUrl", Amf0Value::String(tc_url.to_string())),
            ("objectEncoding", Amf0Value::Number(0.0)),
        ]));
        cmd
    }

    pub fn create_stream(transaction_id: f64) -> Self {
        let mut cmd = RtmpCommand::new("createStream", transaction_id);
        cmd.command_object = Some(Amf0Value::Null);
        cmd
    }

    pub fn publish(stream_name: &str, publish_type: &str) -> Self {
        let mut cmd = RtmpCommand::new("publish", 0.0);
        cmd.command_object = Some(Amf0Value::Null);
        cmd.arguments.push(Amf0Value::String(stream_name.to_string()));
        cmd.arguments.push(Amf0Value::String(publish_type.to_string()));
        cmd
    }

    pub fn play(stream_name: &str, start: f64) -> Self {
        let mut cmd = RtmpCommand::new("play", 0.0);
        cmd.command_object = Some(Amf0Value::Null);
        cmd.arguments.push(Amf0Value::String(stream_name.to_string()));
        cmd.arguments.push(Amf0Value::Number(start));
        cmd
    }

    pub fn delete_stream(stream_id: u32) -> Self {
        let mut cmd = RtmpCommand::new("deleteStream", 0.0);
        cmd.command_object = Some(Amf0Value::Null);
        cmd.arguments.push(Amf0Value::Number(stream_id as f64));
        cmd
    }

    /// _result response
    pub fn result(transaction_id: f64, properties: Amf0Value, information: Amf0Value) -> Self {
        let mut cmd = RtmpCommand::new("_result", transaction_id);
        cmd.command_object = Some(properties);
        cmd.arguments.push(information);
        cmd
    }

    /// _error response
    pub fn error(transaction_id: f64, information: Amf0Value) -> Self {
        let mut cmd = RtmpCommand::new("_error", transaction_id);
        cmd.command_object = Some(Amf0Value::Null);
        cmd.arguments.push(information);
        cmd
    }

    /// onStatus notification
    pub fn on_status(level: &str, code: &str, description: &str) -> Self {
        let mut cmd = RtmpCommand::new("onStatus", 0.0);
        cmd.command_object = Some(Amf0Value::Null);
        cmd.arguments.push(crate::amf::amf0_object([
            ("level", Amf0Value::String(level.to_string())),
            ("code", Amf0Value::String(code.to_string())),
            ("description", Amf0Value::String(description.to_string())),
            ("clientid", Amf0Value::Number(1.0)),
        ]));
        cmd
    }

    /// First string argument (stream name for publish/play)
    pub fn first_string_argument(&self) -> Option<&str> {
        self.arguments.iter().find_map(|arg| arg.as_string())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::String(self.name.clone()))?;
        encoder.encode(&Amf0Value::Number(self.transaction_id))?;
        match &self.command_object {
            Some(obj) => encoder.encode(obj)?,
            None => encoder.encode(&Amf0Value::Null)?,
        }
        for arg in &self.arguments {
            encoder.encode(arg)?;
        }
        Ok(encoder.into_bytes())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(data.to_vec());
        let mut decoder = Amf0Decoder::new(&mut buffer);

        let name = decoder
            .decode()?
            .as_string()
            .ok_or_else(|| Error::amf_decode("Command name must be a string"))?
            .to_string();

        let transaction_id = decoder
            .decode()?
            .as_number()
            .ok_or_else(|| Error::amf_decode("Transaction ID must be a number"))?;

        let command_object = if decoder.has_remaining() {
            Some(decoder.decode()?)
        } else {
            None
        };

        let mut arguments = Vec::new();
        while decoder.has_remaining() {
            arguments.push(decoder.decode()?);
        }

        Ok(RtmpCommand {
            name,
            transaction_id,
            command_object,
            arguments,
        })
    }
}
