//! Resume and job description pairs for E2E testing

/// A resume/job pairing with a rough expectation of how well they match
#[derive(Debug, Clone)]
pub struct MatchFixture {
    pub name: &'static str,
    pub resume_lines: &'static [&'static str],
    pub job_description: &'static str,
    pub expect_strong_match: bool,
}

pub const MATCH_FIXTURES: &[MatchFixture] = &[
    MatchFixture {
        name: "backend_python",
        resume_lines: &[
            "Jane Doe - Backend Engineer",
            "6 years building Python and Django services",
            "PostgreSQL, Redis, Docker, AWS ECS",
            "Led migration of billing platform to microservices",
        ],
        job_description: "Senior Backend Engineer. Requirements: Python, Django, PostgreSQL, \
            Docker, AWS. Experience with microservices and payment systems preferred.",
        expect_strong_match: true,
    },
    MatchFixture {
        name: "designer_for_kernel_role",
        resume_lines: &[
            "Sam Lee - Graphic Designer",
            "Figma, Adobe Illustrator, brand identity",
            "Designed packaging for consumer products",
        ],
        job_description: "Linux Kernel Engineer. Requirements: C, kernel module development, \
            memory management, device drivers, git send-email workflow.",
        expect_strong_match: false,
    },
];

/// Build a single-page PDF whose text layer holds `lines`.
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from("BT /F1 12 Tf 72 720 Td 14 TL\n");
    for line in lines {
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        content.push_str(&format!("({escaped}) Tj T*\n"));
    }
    content.push_str("ET");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", index + 1));
    }

    let xref_at = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.into_bytes()
}
