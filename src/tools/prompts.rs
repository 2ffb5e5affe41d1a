// src/tools/prompts.rs
// Prompt text for the three tools, in English and Chinese

use super::{AnalysisType, Language, ReportTemplate};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;

/// Question used when `analyze_image` is called without one
pub const DEFAULT_IMAGE_QUESTION: &str =
    "Describe the findings in this medical image and give your assessment.";

const DEFAULT_IMAGE_QUESTION_ZH: &str = "请描述这张医学影像中的发现并给出您的评估。";

pub fn default_image_question(language: Language) -> &'static str {
    match language {
        Language::En => DEFAULT_IMAGE_QUESTION,
        Language::Zh => DEFAULT_IMAGE_QUESTION_ZH,
    }
}

pub fn analyst_system(analysis_type: AnalysisType, language: Language) -> String {
    let kind = analysis_type.as_str();
    match language {
        Language::En => format!(
            "You are a medical image analyst specialising in {kind} imaging.\n\
             Structure your assessment as:\n\
             1. Technical quality: positioning, technique, artifacts or limitations.\n\
             2. Anatomy: visible structures, normal appearances, variants.\n\
             3. Abnormal findings: location, size, morphology, severity.\n\
             4. Interpretation: differential diagnosis and clinical significance.\n\
             5. Recommendations: further studies and follow-up urgency.\n\
             Answer the user's question directly before the structured assessment."
        ),
        Language::Zh => format!(
            "您是一位{kind}医学影像分析专家。\n\
             请按以下结构给出评估：\n\
             1. 技术质量：体位、技术参数、伪影或限制。\n\
             2. 解剖学观察：可见结构、正常表现、变异。\n\
             3. 异常发现：位置、大小、形态、严重程度。\n\
             4. 临床解读：鉴别诊断及临床意义。\n\
             5. 建议：进一步检查及随访紧急程度。\n\
             请先直接回答用户的问题，再给出结构化评估。"
        ),
    }
}

/// User text for `analyze_image`: the question verbatim, then any patient context
pub fn analyst_user(question: &str, patient_context: Option<&str>, language: Language) -> String {
    match patient_context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => {
            let label = match language {
                Language::En => "Patient context",
                Language::Zh => "患者背景",
            };
            format!("{question}\n\n{label}: {context}")
        }
        None => question.to_string(),
    }
}

pub fn report_system(language: Language) -> String {
    match language {
        Language::En => "You are a medical reporting specialist. Write clear, accurate, \
                         professional reports for clinicians."
            .to_string(),
        Language::Zh => "您是一位专业的医学报告专家。请为临床医生撰写清晰、准确、专业的报告。"
            .to_string(),
    }
}

/// Inputs to the report prompt after defaults are applied
#[derive(Debug, Clone)]
pub struct ReportPrompt<'a> {
    pub report_type: &'a str,
    pub template: &'a ReportTemplate,
    pub findings: &'a [String],
    pub patient_info: Option<&'a BTreeMap<String, Value>>,
    pub language: Language,
    pub date: NaiveDate,
}

pub fn report_user(p: &ReportPrompt<'_>) -> String {
    let findings = if p.findings.is_empty() {
        None
    } else {
        Some(
            p.findings
                .iter()
                .map(|f| format!("- {}", f.trim()))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    };
    let patient = p
        .patient_info
        .filter(|info| !info.is_empty())
        .and_then(|info| serde_json::to_string_pretty(info).ok());

    match p.language {
        Language::En => {
            let mut out = format!(
                "Generate a {} medical report for the attached image.\n\n",
                p.report_type
            );
            out.push_str(&format!(
                "Prior findings:\n{}\n\n",
                findings.as_deref().unwrap_or("None provided")
            ));
            out.push_str(&format!(
                "Patient information:\n{}\n\n",
                patient.as_deref().unwrap_or("Not provided")
            ));
            out.push_str(&format!(
                "Use this layout:\n\n\
                 **MEDICAL REPORT - {}**\n\
                 Date: {}\n\n\
                 **FINDINGS:**\n[each observation with its clinical correlation]\n\n\
                 **IMPRESSION:**\n[concise summary of the key findings]\n\n\
                 **RECOMMENDATIONS:**\n[follow-up, further studies, management]\n\n",
                p.report_type.to_uppercase(),
                p.date.format("%Y-%m-%d")
            ));
            out.push_str(&template_instruction_en(p.template));
            out
        }
        Language::Zh => {
            let mut out = format!("请为所附影像生成一份{}医学报告。\n\n", p.report_type);
            out.push_str(&format!(
                "既往发现：\n{}\n\n",
                findings.as_deref().unwrap_or("未提供")
            ));
            out.push_str(&format!(
                "患者信息：\n{}\n\n",
                patient.as_deref().unwrap_or("未提供")
            ));
            out.push_str(&format!(
                "请使用以下格式：\n\n\
                 **医学报告 - {}**\n\
                 日期：{}\n\n\
                 **检查发现：**\n[每项发现及其临床关联]\n\n\
                 **诊断印象：**\n[关键发现的简要总结]\n\n\
                 **建议：**\n[随访、进一步检查或处理意见]\n\n",
                p.report_type.to_uppercase(),
                p.date.format("%Y年%m月%d日")
            ));
            out.push_str(&template_instruction_zh(p.template));
            out
        }
    }
}

fn template_instruction_en(template: &ReportTemplate) -> String {
    match template {
        ReportTemplate::Standard => "Keep the level of detail of a standard clinical report.".into(),
        ReportTemplate::Detailed => {
            "Be thorough: describe every structure examined and justify each conclusion.".into()
        }
        ReportTemplate::Brief => "Be brief: one or two sentences per section.".into(),
        ReportTemplate::Custom(text) => format!("Follow this template exactly:\n{text}"),
    }
}

fn template_instruction_zh(template: &ReportTemplate) -> String {
    match template {
        ReportTemplate::Standard => "请保持标准临床报告的详细程度。".into(),
        ReportTemplate::Detailed => "请详尽描述所检查的每个结构，并说明每项结论的依据。".into(),
        ReportTemplate::Brief => "请简明扼要，每部分一至两句话。".into(),
        ReportTemplate::Custom(text) => format!("请严格遵循以下模板：\n{text}"),
    }
}

pub fn qa_system(specialty: &str, language: Language) -> String {
    match language {
        Language::En => format!(
            "You are a medical expert in {specialty}. Give accurate, evidence-based answers, \
             explain the terminology you use, and state important caveats. \
             Your answers are educational and do not replace a professional consultation."
        ),
        Language::Zh => format!(
            "您是一位{specialty}领域的医学专家。请给出准确、基于循证医学的回答，\
             解释所用术语，并说明重要的注意事项。回答仅供教育参考，不能替代专业医疗咨询。"
        ),
    }
}

/// User text for `answer_question`: the question verbatim, then any context
pub fn qa_user(question: &str, context: Option<&str>, language: Language) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => {
            let label = match language {
                Language::En => "Context",
                Language::Zh => "背景",
            };
            format!("{}\n\n{label}: {context}", question.trim())
        }
        None => question.trim().to_string(),
    }
}
