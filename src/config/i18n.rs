//! Internationalization (i18n) module for participant-facing messages.

/// Participant messages structure
#[derive(Debug, Clone)]
pub struct Messages {
    pub resize_instructions: &'static str,
    pub finish: &'static str,
    pub blindspot_intro: &'static str,
    pub blindspot_steps: [&'static str; 4],
    pub blindspot_ready: &'static str,
    pub remaining_measurements: &'static str,
    pub dpi: &'static str,
    pub calibration_complete: &'static str,
    pub not_resized: &'static str,
}

/// Chinese messages
pub static MESSAGES_ZH: Messages = Messages {
    resize_instructions: "请将一张信用卡贴在屏幕上，调整下方方框的大小，使其与信用卡大小一致。这将帮助我们计算显示器的准确 DPI。\n拖动方框右下角即可调整大小。",
    finish: "完成",
    blindspot_intro: "现在我们将快速测量您与屏幕的距离。",
    blindspot_steps: [
        "将左手放在空格键上。",
        "用右手遮住右眼。",
        "用左眼注视黑色方块，并保持注视。",
        "红色圆点从右向左移动时会消失，圆点消失时立即按下空格键。",
    ],
    blindspot_ready: "准备好后按空格键开始。",
    remaining_measurements: "剩余测量次数",
    dpi: "DPI",
    calibration_complete: "校准完成",
    not_resized: "请先调整方框大小再点击完成",
};

/// English messages
pub static MESSAGES_EN: Messages = Messages {
    resize_instructions: "Please hold a credit card up to the screen and resize the box below to match the size of the credit card. This will help us calculate the accurate DPI for your display.\nClick on the bottom right corner of the box and drag to resize it.",
    finish: "Finish",
    blindspot_intro: "Now we will quickly measure how far away you are sitting.",
    blindspot_steps: [
        "Put your left hand on the space bar.",
        "Cover your right eye with your right hand.",
        "Using your left eye, focus on the black square. Keep your focus on the black square.",
        "The red ball will disappear as it moves from right to left. Press the space bar as soon as the ball disappears.",
    ],
    blindspot_ready: "Press the space bar when you are ready to begin.",
    remaining_measurements: "remaining measurements",
    dpi: "DPI",
    calibration_complete: "Calibration complete",
    not_resized: "Please resize the box before pressing finish",
};

/// Get participant messages by language.
///
/// # Arguments
/// * `lang` - Language code, "cn" for Chinese, "en" for English.
///
/// # Returns
/// Reference to Messages struct.
pub fn get_messages(lang: &str) -> &'static Messages {
    match lang {
        "cn" => &MESSAGES_ZH,
        _ => &MESSAGES_EN,
    }
}

impl Messages {
    /// Full blind spot instructions as one block of text.
    pub fn blindspot_instructions(&self) -> String {
        let steps = self
            .blindspot_steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {}", i + 1, step))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n{}\n{}", self.blindspot_intro, steps, self.blindspot_ready)
    }
}
