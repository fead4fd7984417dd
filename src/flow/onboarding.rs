//! Built-in onboarding flows
//!
//! Identity selection, then student or parent profile capture.

use super::{FlowDefinition, InputKind, Step};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

pub const STUDENT_KEYWORD: &str = "学生";

const GRADES: [&str; 9] = [
    "一年级", "二年级", "三年级", "四年级", "五年级", "六年级", "初一", "初二", "初三",
];

/// Which built-in flow to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingFlow {
    Identity,
    Student,
    Parent,
}

impl OnboardingFlow {
    #[must_use]
    pub fn definition(self) -> FlowDefinition {
        match self {
            OnboardingFlow::Identity => identity_flow(),
            OnboardingFlow::Student => student_profile_flow(),
            OnboardingFlow::Parent => parent_profile_flow(),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            OnboardingFlow::Identity => "identity",
            OnboardingFlow::Student => "student",
            OnboardingFlow::Parent => "parent",
        }
    }
}

impl fmt::Display for OnboardingFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OnboardingFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" => Ok(OnboardingFlow::Identity),
            "student" => Ok(OnboardingFlow::Student),
            "parent" => Ok(OnboardingFlow::Parent),
            other => Err(format!(
                "Unknown flow '{other}' (expected identity, student or parent)"
            )),
        }
    }
}

/// Asks who is using the app and branches on the spoken answer
#[must_use]
pub fn identity_flow() -> FlowDefinition {
    FlowDefinition::new("ask-identity")
        .step(
            Step::new(
                "ask-identity",
                "你好！我是你的AI学习伙伴。请告诉我，你是学生还是家长？",
                InputKind::VoiceChoice,
            )
            .input_config(json!({ "options": ["我是学生", "我是家长"] }))
            .field("identity")
            .next_with(|answer| {
                if answer.contains(STUDENT_KEYWORD) {
                    "confirm-student".to_string()
                } else {
                    "confirm-parent".to_string()
                }
            }),
        )
        .step(Step::new(
            "confirm-student",
            "太好了！接下来我们一起建立你的学习档案吧。",
            InputKind::ConfirmCard,
        ))
        .step(Step::new(
            "confirm-parent",
            "欢迎您！接下来请帮孩子建立学习档案。",
            InputKind::ConfirmCard,
        ))
}

#[must_use]
pub fn student_profile_flow() -> FlowDefinition {
    FlowDefinition::new("ask-name")
        .step(
            Step::new("ask-name", "先认识一下吧，你叫什么名字？", InputKind::Text)
                .field("name")
                .next("ask-grade"),
        )
        .step(
            Step::new("ask-grade", "{name}同学你好！你现在读几年级？", InputKind::TagSelect)
                .input_config(json!({ "tags": GRADES }))
                .field("grade")
                .next("ask-subjects"),
        )
        .step(
            Step::new(
                "ask-subjects",
                "{grade}的功课不轻松呢。你最想提高哪些科目？",
                InputKind::MultiSelect,
            )
            .input_config(json!({ "options": ["语文", "数学", "英语", "科学"] }))
            .field("subjects")
            .next("capture-voiceprint"),
        )
        .step(
            Step::new(
                "capture-voiceprint",
                "最后，请读出屏幕上的句子，让我记住你的声音。",
                InputKind::BiometricCapture,
            )
            .input_config(json!({ "duration_ms": 3000 }))
            .field("voiceprint")
            .next("confirm-profile"),
        )
        .step(
            Step::new(
                "confirm-profile",
                "档案建好啦：{name}，{grade}，重点科目：{subjects}。确认无误吗？",
                InputKind::ConfirmCard,
            )
            .field("confirmed"),
        )
}

#[must_use]
pub fn parent_profile_flow() -> FlowDefinition {
    FlowDefinition::new("ask-parent-name")
        .step(
            Step::new("ask-parent-name", "您好！请问怎么称呼您？", InputKind::Text)
                .field("parent_name")
                .next("ask-child-name"),
        )
        .step(
            Step::new(
                "ask-child-name",
                "{parent_name}您好！孩子叫什么名字？",
                InputKind::Text,
            )
            .field("child_name")
            .next("ask-child-grade"),
        )
        .step(
            Step::new("ask-child-grade", "{child_name}现在读几年级？", InputKind::TagSelect)
                .input_config(json!({ "tags": GRADES }))
                .field("child_grade")
                .next("ask-relationship"),
        )
        .step(
            Step::new(
                "ask-relationship",
                "您是{child_name}的？",
                InputKind::VoiceChoice,
            )
            .input_config(json!({ "options": ["爸爸", "妈妈", "其他"] }))
            .field("relationship")
            .next("confirm-profile"),
        )
        .step(
            Step::new(
                "confirm-profile",
                "好的{parent_name}，已为{child_name}（{child_grade}）建立档案，请确认。",
                InputKind::ConfirmCard,
            )
            .field("confirmed"),
        )
}
