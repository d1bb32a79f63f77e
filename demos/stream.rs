use recon_core::api::{parse_named, to_json};
use recon_core::{size_of, Envelope, Interpreter, Output, StreamParser, Writer};

fn main() {
    let recon_data = "@event(node:\"/house/kitchen\",lane:lights) {\n    on: true\n    level: $base * 2\n    base: 40\n}";

    // feed the document in small chunks, as it would arrive off a socket
    let mut parser = StreamParser::new();
    for chunk in recon_data.as_bytes().chunks(7) {
        parser = parser.feed(chunk);
    }
    let value = match parser.end().bind() {
        Ok(value) => value,
        Err(_) => {
            // reparse with the source attached for a readable report
            if let Err(e) = parse_named(recon_data, "stream.recon") {
                eprintln!("{:?}", miette::Report::new(e));
            }
            return;
        }
    };

    match Envelope::decode(&value) {
        Ok(envelope) => println!(
            "Received @{} for {} on lane {}",
            envelope.kind, envelope.node, envelope.lane
        ),
        Err(e) => eprintln!("Not an envelope: {e}"),
    }

    match Interpreter::new().evaluate(&value) {
        Ok(evaluated) => {
            // write the evaluated record back out through a fixed 16 byte buffer
            let mut text = Vec::with_capacity(size_of(&evaluated));
            let mut buf = [0u8; 16];
            let mut writer = Writer::new(&evaluated);
            while writer.is_cont() {
                let mut output = Output::new(&mut buf);
                writer = writer.pull(&mut output);
                text.extend_from_slice(output.bytes());
            }
            println!("Evaluated: {}", String::from_utf8_lossy(&text));
            match to_json(&evaluated) {
                Ok(json) => println!("As JSON:\n{json}"),
                Err(e) => eprintln!("Failed to serialize: {e}"),
            }
        }
        Err(e) => eprintln!("Failed to evaluate: {e}"),
    }
}
