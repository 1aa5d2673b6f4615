//! Static help page describing how to upload seeds from the game with the seed sharing mod.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModLink {
    pub label: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModStep {
    pub title: &'static str,
    pub paragraphs: &'static [&'static str],
    pub links: &'static [ModLink],
}

pub const HEADLINE: &str = "Add seeds from game with the mod";
pub const INTRO: &str = "To easily add seeds from the game, you need to do a few things:";

pub const STEPS: [ModStep; 4] = [
    ModStep {
        title: "1. Enable debug mode in game",
        paragraphs: &[
            "Add a debug_enable.txt file to your game data directory \
             (...\\Steam\\steamapps\\common\\OxygenNotIncluded\\OxygenNotIncluded_Data\\debug_enable.txt).",
            "To check that it works press Backspace in a loaded game: a menu should open on the right side.",
        ],
        links: &[],
    },
    ModStep {
        title: "2. Install the ModLoader",
        paragraphs: &[
            "This step is a bit more involved, but in the end it is just copying a few files.",
            "Download the newest ModLoader release and place it in the \
             ...\\Steam\\steamapps\\common\\OxygenNotIncluded\\OxygenNotIncluded_Data\\Managed game folder, \
             or visit the forum thread for help and more details.",
        ],
        links: &[
            ModLink {
                label: "ModLoader.dll",
                url: "https://github.com/javisar/ONI-Modloader/blob/master/Managed/ModLoader.dll",
            },
            ModLink {
                label: "forum thread",
                url: "https://forums.kleientertainment.com/topic/88186-mod01-oni-modloader/",
            },
        ],
    },
    ModStep {
        title: "3. Download the Seed Sharing Mod",
        paragraphs: &[
            "Download the mod and put it in the Mods folder the ModLoader created in your game directory.",
        ],
        links: &[ModLink {
            label: "seed sharing mod",
            url: "https://www.dropbox.com/sh/9rthkmzrnyl2zi0/AAAQuno33XiOlw3Uxdrzm-10a?dl=0",
        }],
    },
    ModStep {
        title: "WIN: Add seeds!",
        paragraphs: &[
            "Reveal the map with debug (press Backspace, the entire map should uncover), press Esc \
             and choose the Upload Seed option at the bottom of the menu.",
            "Please upload only legit seeds: original, vanilla world generation created in the \
             current game version. This place is by people for people, so uploaded data has to be \
             correct and useful.",
        ],
        links: &[],
    },
];

pub const SCREENSHOT: ModLink = ModLink {
    label: "P.S. It's this button up here!",
    url: "https://puu.sh/BNLaz/fd5b68c1fe.png",
};

pub const MOD_VERSION: u32 = 1;
pub const LAST_UPDATE: &str = "20/10/2018";

pub fn footer() -> String {
    format!("Current mod version: {MOD_VERSION}. Last update: {LAST_UPDATE}")
}

/// Plain-text rendering used by the `mod-info` subcommand.
pub fn plain_text() -> String {
    let mut out = String::new();
    out.push_str(HEADLINE);
    out.push_str("\n\n");
    out.push_str(INTRO);
    out.push('\n');
    for step in &STEPS {
        out.push('\n');
        out.push_str(step.title);
        out.push('\n');
        for paragraph in step.paragraphs {
            out.push_str("  ");
            out.push_str(paragraph);
            out.push('\n');
        }
        for link in step.links {
            out.push_str(&format!("  {}: {}\n", link.label, link.url));
        }
    }
    out.push_str(&format!("\n{} ({})\n\n", SCREENSHOT.label, SCREENSHOT.url));
    out.push_str(&footer());
    out.push('\n');
    out
}
