use std::error::Error;

use midnam_core::names::DEFAULT_DOCTYPE;
use midnam_core::{merge_structure, normalize, StructureUpdate};
use midnam_xml::{Document, Indent};

const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MIDINameDocument>
    <Author>demo</Author>
    <MasterDeviceNames>
        <Manufacturer>Acme</Manufacturer>
        <Model>Synth One</Model>
        <ChannelNameSet Name="Old">
            <AvailableForChannels>
                <AvailableChannel Channel="1" Available="true"/>
            </AvailableForChannels>
        </ChannelNameSet>
    </MasterDeviceNames>
</MIDINameDocument>
"#;

const PAYLOAD: &str = r#"{
    "channelNameSets": [
        {
            "name": "Factory",
            "available_channels": [
                { "channel": 1, "available": true },
                { "channel": "2", "available": false }
            ]
        }
    ],
    "patchList": [
        {
            "name": "Bank A",
            "channelNameSet": "Factory",
            "midi_commands": [{ "type": "ControlChange", "control": 0, "value": 0 }],
            "patch": [
                { "name": "Piano", "Number": "1", "programChange": 0 },
                { "name": "Strings", "Number": "2", "programChange": 1, "note_list_name": "Drums" }
            ]
        }
    ],
    "note_lists": [
        { "name": "Drums", "notes": [{ "number": 36, "name": "Kick" }] }
    ],
    "supportsStandardDeviceMode": true
}"#;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let mut doc = Document::parse(XML)?;
    let update: StructureUpdate = serde_json::from_str(PAYLOAD)?;

    let summary = merge_structure(&mut doc.root, &update)?;
    println!("merge: {}", serde_json::to_string(&summary)?);

    let report = normalize(&mut doc.root);
    for fix in &report.fixes {
        println!("fix: {fix}");
    }

    println!("{}", doc.render(DEFAULT_DOCTYPE, Indent::spaces(2))?);
    Ok(())
}
